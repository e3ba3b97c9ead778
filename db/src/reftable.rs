use std::fs;
use std::io;
use std::path::Path;

/// The read-only manufacturer id → name table, consulted only for manufacturers the
/// database does not know yet.
///
/// One entry per line: the 11-bit id, whitespace, and the display name.  Blank lines and
/// `#` comments are skipped.
#[derive(Clone, Debug, Default)]
pub struct ReferenceTable {
    entries: Vec<(String, String)>,
}

const BUILTIN: &str = include_str!("../data/manufacturers");

impl ReferenceTable {
    /// The small JEP106 table shipped with the crate.
    pub fn builtin() -> Self {
        Self::parse(BUILTIN)
    }

    pub fn parse(text: &str) -> Self {
        let mut entries = vec![];
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((id, name)) = line.split_once(char::is_whitespace) else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            entries.push((id.to_string(), name.to_string()));
        }
        ReferenceTable { entries }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(eid, _)| eid == id)
            .map(|(_, name)| name.as_str())
    }
}

/// Turns a display name into a folder name: the first word, lower-cased, alphanumerics only.
pub fn folder_name(display: &str) -> String {
    display
        .split_whitespace()
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[test]
fn test_parse() {
    let table = ReferenceTable::parse(
        "# JEP106 bank 0\n\
         00000000001\tAMD\n\
         \n\
         00000100000 STMicroelectronics\n\
         00000010111   Texas Instruments  \n\
         00000001001\n",
    );
    assert_eq!(table.len(), 3);
    assert_eq!(table.lookup("00000100000"), Some("STMicroelectronics"));
    assert_eq!(table.lookup("00000010111"), Some("Texas Instruments"));
    assert_eq!(table.lookup("00000001001"), None);
    assert_eq!(table.lookup("0000010000"), None);
}

#[test]
fn test_builtin() {
    let table = ReferenceTable::builtin();
    assert!(!table.is_empty());
    assert_eq!(table.lookup("00000100000"), Some("STMicroelectronics"));
    assert_eq!(table.lookup("00001001001"), Some("Xilinx"));
}

#[test]
fn test_folder_name() {
    assert_eq!(folder_name("STMicroelectronics"), "stmicroelectronics");
    assert_eq!(folder_name("Analog Devices"), "analog");
    assert_eq!(folder_name("ACME_CORP"), "acmecorp");
    assert_eq!(folder_name("  "), "");
}
