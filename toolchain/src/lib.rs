use serde::Deserialize;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;
use which::which_in;

pub const DEFAULT_VALIDATOR: &str = "bsdl2jtag";

/// The external BSDL syntax checker.
///
/// It is invoked as `<command> <input> <discard>`, and only its exit status matters:
/// zero means the input is well-formed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Validator {
    pub command: String,
    /// Where the checker writes its converted output.  Nobody reads it.
    pub discard: PathBuf,
    pub env: HashMap<String, String>,
}

impl Default for Validator {
    fn default() -> Self {
        Validator {
            command: DEFAULT_VALIDATOR.to_string(),
            discard: PathBuf::from("/dev/null"),
            env: HashMap::new(),
        }
    }
}

impl Validator {
    pub fn new(command: impl Into<String>) -> Self {
        Validator {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn command(&self) -> io::Result<Command> {
        let mut res = if let Some(path) = self.env.get("PATH") {
            let rcmd = which_in(&self.command, Some(path), "/")
                .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?;
            Command::new(rcmd)
        } else {
            Command::new(&self.command)
        };
        for (k, v) in self.env.iter() {
            res.env(k, v);
        }
        Ok(res)
    }

    /// Runs the checker on `input`.  `Err` means the checker itself could not be run.
    pub fn check(&self, input: &Path) -> io::Result<bool> {
        let mut cmd = self.command()?;
        cmd.stdin(Stdio::null());
        cmd.arg(input);
        cmd.arg(&self.discard);
        let out = cmd.output()?;
        if !out.status.success() {
            debug!(
                input = %input.display(),
                status = %out.status,
                stderr = %String::from_utf8_lossy(&out.stderr).trim_end(),
                "validator rejected input"
            );
        }
        Ok(out.status.success())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status() {
        let input = Path::new("chip.bsdl");
        assert!(Validator::new("true").check(input).unwrap());
        assert!(!Validator::new("false").check(input).unwrap());
    }

    #[test]
    fn test_missing_command() {
        let v = Validator::new("jtagdb-no-such-validator");
        assert!(v.check(Path::new("chip.bsdl")).is_err());
    }

    #[test]
    fn test_from_toml() {
        let v: Validator = toml::from_str("command = \"bsdl-check\"\n").unwrap();
        assert_eq!(v.command, "bsdl-check");
        assert_eq!(v.discard, PathBuf::from("/dev/null"));
        assert!(v.env.is_empty());
    }
}
