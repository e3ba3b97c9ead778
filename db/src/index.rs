//! The on-disk database: a directory tree with one index file per level.
//!
//! ```text
//! <root>/MANUFACTURERS
//! <root>/<manufacturer>/PARTS
//! <root>/<manufacturer>/<part>/STEPPINGS
//! <root>/<manufacturer>/<part>/<part data file>
//! ```
//!
//! Every index line of the form `code<TAB>folder<TAB>display` is a definition.  Anything
//! else (comments, blank lines, garbage) is kept as-is and otherwise ignored.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::InjectError;

pub const MANUFACTURERS: &str = "MANUFACTURERS";
pub const PARTS: &str = "PARTS";
pub const STEPPINGS: &str = "STEPPINGS";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Level {
    Manufacturers,
    Parts { manufacturer: String },
    Steppings { manufacturer: String, part: String },
}

impl Level {
    pub fn parts(manufacturer: &str) -> Self {
        Level::Parts {
            manufacturer: manufacturer.to_string(),
        }
    }

    pub fn steppings(manufacturer: &str, part: &str) -> Self {
        Level::Steppings {
            manufacturer: manufacturer.to_string(),
            part: part.to_string(),
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Level::Manufacturers => MANUFACTURERS,
            Level::Parts { .. } => PARTS,
            Level::Steppings { .. } => STEPPINGS,
        }
    }

    /// The directory holding this level's index file and its children.
    pub fn dir(&self, root: &Path) -> PathBuf {
        match self {
            Level::Manufacturers => root.to_path_buf(),
            Level::Parts { manufacturer } => root.join(manufacturer),
            Level::Steppings { manufacturer, part } => root.join(manufacturer).join(part),
        }
    }

    pub fn index_path(&self, root: &Path) -> PathBuf {
        self.dir(root).join(self.file_name())
    }

    /// Whether the child a record refers to is on disk.  Manufacturer and part records name
    /// subdirectories; stepping records name the part data file.
    fn child_present(&self, dir: &Path, folder: &str) -> bool {
        let path = dir.join(folder);
        match self {
            Level::Steppings { .. } => path.is_file(),
            _ => path.is_dir(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexRecord {
    pub code: String,
    pub folder: String,
    pub display: String,
}

impl IndexRecord {
    pub fn new(code: &str, folder: &str, display: &str) -> Self {
        IndexRecord {
            code: code.to_string(),
            folder: folder.to_string(),
            display: display.to_string(),
        }
    }

    /// Parses a definition line.  Fields are separated by one or more tabs, so aligned
    /// files still read correctly; there must be exactly three of them.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with('#') {
            return None;
        }
        let mut fields = line.split('\t').filter(|f| !f.is_empty());
        let code = fields.next()?;
        let folder = fields.next()?;
        let display = fields.next()?;
        if fields.next().is_some() {
            return None;
        }
        if code.contains(' ') || folder.contains(' ') {
            return None;
        }
        Some(IndexRecord::new(code, folder, display))
    }

    pub fn to_line(&self) -> String {
        format!("{}\t{}\t{}", self.code, self.folder, self.display)
    }
}

/// A line as read from disk.  Only lines that decode as UTF-8 can be definitions; the rest
/// are carried through untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
struct IndexLine {
    raw: Vec<u8>,
    record: Option<IndexRecord>,
}

impl IndexLine {
    fn new(raw: &[u8]) -> Self {
        IndexLine {
            raw: raw.to_vec(),
            record: std::str::from_utf8(raw).ok().and_then(IndexRecord::parse),
        }
    }
}

/// One index file, loaded in full.  Lookups are linear; the files are small.
#[derive(Clone, Debug)]
pub struct IndexFile {
    path: PathBuf,
    lines: Vec<IndexLine>,
    trailing_newline: bool,
}

impl IndexFile {
    /// Loads an index.  A missing file reads as an empty index.
    pub fn load(path: &Path) -> io::Result<Self> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => vec![],
            Err(e) => return Err(e),
        };
        Ok(IndexFile::parse(path, &data))
    }

    /// Splits on `\n` only, so `\r\n` files keep their `\r` on every line.
    fn parse(path: &Path, data: &[u8]) -> Self {
        let lines = if data.is_empty() {
            vec![]
        } else {
            let body = data.strip_suffix(b"\n").unwrap_or(data);
            body.split(|&b| b == b'\n').map(IndexLine::new).collect()
        };
        IndexFile {
            path: path.to_path_buf(),
            lines,
            trailing_newline: data.is_empty() || data.ends_with(b"\n"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> impl Iterator<Item = &IndexRecord> {
        self.lines.iter().filter_map(|line| line.record.as_ref())
    }

    pub fn find(&self, code: &str) -> Option<&IndexRecord> {
        self.records().find(|rec| rec.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.find(code).is_some()
    }

    pub fn render(&self) -> Vec<u8> {
        let mut out = vec![];
        for (i, line) in self.lines.iter().enumerate() {
            if i != 0 {
                out.push(b'\n');
            }
            out.extend_from_slice(&line.raw);
        }
        if !self.lines.is_empty() && self.trailing_newline {
            out.push(b'\n');
        }
        out
    }

    /// Appends a definition to both the in-memory copy and the file.  The new line uses the
    /// same line ending as the last line already there.
    pub fn append(&mut self, record: IndexRecord) -> io::Result<()> {
        let crlf = self
            .lines
            .last()
            .is_some_and(|line| line.raw.ends_with(b"\r"));
        let mut line = record.to_line();
        if crlf {
            line.push('\r');
        }
        let mut data = vec![];
        if !self.trailing_newline {
            data.push(b'\n');
        }
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        f.write_all(&data)?;
        self.lines.push(IndexLine {
            raw: line.into_bytes(),
            record: Some(record),
        });
        self.trailing_newline = true;
        Ok(())
    }

    /// Drops every definition the predicate rejects, keeping all other lines and the
    /// relative order of the survivors.  Returns the dropped records.
    pub fn retain(&mut self, mut keep: impl FnMut(&IndexRecord) -> bool) -> Vec<IndexRecord> {
        let mut removed = vec![];
        self.lines.retain(|line| match &line.record {
            Some(rec) if !keep(rec) => {
                removed.push(rec.clone());
                false
            }
            _ => true,
        });
        removed
    }

    pub fn store(&self) -> io::Result<()> {
        fs::write(&self.path, self.render())
    }
}

/// A database rooted at some directory.  This is the only thing that touches index files.
#[derive(Clone, Debug)]
pub struct Database {
    root: PathBuf,
}

impl Database {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Database { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index(&self, level: &Level) -> Result<IndexFile, InjectError> {
        let path = level.index_path(&self.root);
        IndexFile::load(&path).map_err(InjectError::io(&path))
    }

    pub fn lookup(&self, level: &Level, code: &str) -> Result<Option<IndexRecord>, InjectError> {
        Ok(self.index(level)?.find(code).cloned())
    }

    pub fn exists(&self, level: &Level, code: &str) -> Result<bool, InjectError> {
        Ok(self.index(level)?.contains(code))
    }

    /// Whether `folder` is already claimed at this level, either by a record or by
    /// something on disk.
    pub fn folder_in_use(&self, level: &Level, folder: &str) -> Result<bool, InjectError> {
        if self.index(level)?.records().any(|rec| rec.folder == folder) {
            return Ok(true);
        }
        Ok(level.dir(&self.root).join(folder).exists())
    }

    /// Creates a directory and an empty index inside it.  Either may already be there.
    fn scaffold(&self, level: &Level) -> Result<(), InjectError> {
        let dir = level.dir(&self.root);
        fs::create_dir_all(&dir).map_err(InjectError::io(&dir))?;
        let path = level.index_path(&self.root);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => {
                info!(path = %path.display(), "created index");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(InjectError::io(&path)(e)),
        }
    }

    /// Appends `record` unless its code is already defined.  Returns whether it was added.
    fn add_record(&self, level: &Level, record: IndexRecord) -> Result<bool, InjectError> {
        let mut index = self.index(level)?;
        if let Some(existing) = index.find(&record.code) {
            debug!(
                index = %index.path().display(),
                code = %existing.code,
                folder = %existing.folder,
                "already defined"
            );
            return Ok(false);
        }
        let dir = level.dir(&self.root);
        fs::create_dir_all(&dir).map_err(InjectError::io(&dir))?;
        info!(index = %index.path().display(), line = %record.to_line(), "appending");
        let path = index.path().to_path_buf();
        index.append(record).map_err(InjectError::io(&path))?;
        Ok(true)
    }

    pub fn add_manufacturer(
        &self,
        code: &str,
        folder: &str,
        display: &str,
    ) -> Result<bool, InjectError> {
        let added = self.add_record(
            &Level::Manufacturers,
            IndexRecord::new(code, folder, display),
        )?;
        if added {
            self.scaffold(&Level::parts(folder))?;
        }
        Ok(added)
    }

    pub fn add_part(
        &self,
        manufacturer: &str,
        code: &str,
        folder: &str,
        display: &str,
    ) -> Result<bool, InjectError> {
        let added = self.add_record(
            &Level::parts(manufacturer),
            IndexRecord::new(code, folder, display),
        )?;
        if added {
            self.scaffold(&Level::steppings(manufacturer, folder))?;
        }
        Ok(added)
    }

    /// Stepping records point at the part data file `name` and display the code itself.
    pub fn add_stepping(
        &self,
        manufacturer: &str,
        part: &str,
        code: &str,
        name: &str,
    ) -> Result<bool, InjectError> {
        self.add_record(
            &Level::steppings(manufacturer, part),
            IndexRecord::new(code, name, code),
        )
    }

    /// Removes dangling records from one index.  The file is only rewritten when something
    /// was actually removed.
    pub fn clean(&self, level: &Level) -> Result<Vec<IndexRecord>, InjectError> {
        let mut index = self.index(level)?;
        let dir = level.dir(&self.root);
        let removed = index.retain(|rec| level.child_present(&dir, &rec.folder));
        if !removed.is_empty() {
            for rec in &removed {
                info!(index = %index.path().display(), line = %rec.to_line(), "removing dangling record");
            }
            index
                .store()
                .map_err(InjectError::io(index.path()))?;
        }
        Ok(removed)
    }

    /// Cleans the whole tree, deepest levels first.  Returns the number of records removed.
    pub fn clean_all(&self) -> Result<usize, InjectError> {
        let mut count = 0;
        let manufacturers = self.index(&Level::Manufacturers)?;
        for mfr in manufacturers.records() {
            let parts_level = Level::parts(&mfr.folder);
            if !parts_level.dir(&self.root).is_dir() {
                continue;
            }
            let parts = self.index(&parts_level)?;
            for part in parts.records() {
                let steppings_level = Level::steppings(&mfr.folder, &part.folder);
                if steppings_level.dir(&self.root).is_dir() {
                    count += self.clean(&steppings_level)?.len();
                }
            }
            count += self.clean(&parts_level)?.len();
        }
        count += self.clean(&Level::Manufacturers)?.len();
        Ok(count)
    }
}
