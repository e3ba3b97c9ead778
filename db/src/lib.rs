//! Registration of BSDL chip descriptions into the UrJTAG part database.
//!
//! The database is a three-level directory tree (manufacturer, part, stepping), each level
//! described by a flat tab-separated index file.  [`inject::Injector`] takes one BSDL file,
//! works out where it belongs, and merges it into the tree without ever duplicating a record.

pub mod bsdl;
pub mod config;
pub mod error;
pub mod index;
pub mod inject;
pub mod reftable;
pub mod resolve;
pub mod stepping;

pub use config::Config;
pub use error::{ConfigError, ExtractionError, InjectError};
pub use index::{Database, IndexRecord, Level};
pub use inject::{Injector, Outcome, Stage, Summary};
pub use reftable::ReferenceTable;
