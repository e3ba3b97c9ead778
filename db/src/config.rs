use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use jtagdb_toolchain::Validator;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_DB_ROOT: &str = "/usr/local/share/urjtag";
pub const DEFAULT_REFERENCE_TABLE: &str = "manufacturers";

/// Everything the injector needs to know about its surroundings.
///
/// ```toml
/// db_root = "/usr/local/share/urjtag"
/// reference_table = "manufacturers"
/// validate = true
///
/// [validator]
/// command = "bsdl2jtag"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_root: PathBuf,
    pub reference_table: PathBuf,
    pub validate: bool,
    pub validator: Validator,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_root: PathBuf::from(DEFAULT_DB_ROOT),
            reference_table: PathBuf::from(DEFAULT_REFERENCE_TABLE),
            validate: true,
            validator: Validator::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&s).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validator(&self) -> Option<&Validator> {
        self.validate.then_some(&self.validator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.db_root, PathBuf::from(DEFAULT_DB_ROOT));
        assert_eq!(config.validator().unwrap().command, "bsdl2jtag");
    }

    #[test]
    fn test_override() {
        let config: Config = toml::from_str(
            "db_root = \"/tmp/db\"\nvalidate = false\n[validator]\ncommand = \"check\"\n",
        )
        .unwrap();
        assert_eq!(config.db_root, PathBuf::from("/tmp/db"));
        assert_eq!(config.reference_table, PathBuf::from("manufacturers"));
        assert!(config.validator().is_none());
        assert_eq!(config.validator.command, "check");
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/jtagdb.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
