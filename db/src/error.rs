use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The chip description lacks, or garbles, the parts needed to identify it.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("IDCODE_REGISTER attribute missing")]
    IdcodeMissing,
    #[error("IDCODE_REGISTER has no quoted bit fields")]
    IdcodeUnquoted,
    #[error("IDCODE_REGISTER is {0} bits long, expected 32")]
    IdcodeLength(usize),
    #[error("IDCODE_REGISTER does not end in the mandatory 1 bit")]
    IdcodeMarker,
    #[error("{field} field {value:?} is not a binary number")]
    NotBinary { field: &'static str, value: String },
    #[error("entity declaration missing")]
    EntityMissing,
    #[error("stepping pattern {0:?} is not 4 bits wide")]
    SteppingWidth(String),
}

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("rejected by validator")]
    InvalidInput,
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("manufacturer id {0} is in neither the database nor the reference table")]
    UnresolvedManufacturer(String),
    #[error("cannot run validator {command}: {source}")]
    Validator {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl InjectError {
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> InjectError + use<> {
        let path = path.to_path_buf();
        move |source| InjectError::Io { path, source }
    }

    /// Fatal errors mean the database root (or the tooling around it) is unusable, and the
    /// whole batch has to stop.  Everything else only disqualifies the one input file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, InjectError::Io { .. } | InjectError::Validator { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
