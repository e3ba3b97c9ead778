use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::bsdl::Bsdl;
use crate::config::Config;
use crate::error::InjectError;
use crate::index::{Database, Level};
use crate::reftable::ReferenceTable;
use crate::resolve::{ChipRecord, resolve};
use crate::stepping;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Extracting,
    ResolvingNames,
    ExpandingSteppings,
    Merging,
    CopyingArtifact,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Validating => "validating",
            Stage::Extracting => "extracting",
            Stage::ResolvingNames => "resolving names",
            Stage::ExpandingSteppings => "expanding steppings",
            Stage::Merging => "merging",
            Stage::CopyingArtifact => "copying artifact",
            Stage::Done => "done",
        })
    }
}

#[derive(Debug)]
pub enum Outcome {
    /// At least one stepping was new; the part data file has been (re)copied.
    Added {
        record: ChipRecord,
        artifact: PathBuf,
        steppings: Vec<String>,
    },
    /// Every stepping was already registered.  Nothing was written.
    AlreadyPresent { record: ChipRecord },
    Skipped { stage: Stage, reason: InjectError },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub processed: usize,
    pub added: usize,
    pub present: usize,
    pub skipped: usize,
    pub steppings: usize,
}

impl Summary {
    fn record(&mut self, outcome: &Outcome) {
        self.processed += 1;
        match outcome {
            Outcome::Added { steppings, .. } => {
                self.added += 1;
                self.steppings += steppings.len();
            }
            Outcome::AlreadyPresent { .. } => self.present += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Registers chip descriptions into one database, one file at a time.
///
/// Assumes it is the only writer of the database; two injectors on the same root will race
/// on index appends.
pub struct Injector {
    config: Config,
    db: Database,
    table: ReferenceTable,
}

impl Injector {
    /// Builds an injector, loading the reference table named by the config.  A table that
    /// cannot be read is replaced by the built-in one.
    pub fn new(config: Config) -> Self {
        let table = match ReferenceTable::load(&config.reference_table) {
            Ok(table) => {
                debug!(
                    path = %config.reference_table.display(),
                    entries = table.len(),
                    "loaded reference table"
                );
                table
            }
            Err(e) => {
                warn!(
                    path = %config.reference_table.display(),
                    "cannot read reference table, using the built-in one: {e}"
                );
                ReferenceTable::builtin()
            }
        };
        Self::with_table(config, table)
    }

    pub fn with_table(config: Config, table: ReferenceTable) -> Self {
        let db = Database::new(&config.db_root);
        Injector { config, db, table }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn read_source(path: &Path) -> Result<String, InjectError> {
        let data = fs::read(path).map_err(InjectError::io(path))?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    fn validate(&self, path: &Path) -> Result<(), InjectError> {
        let Some(validator) = self.config.validator() else {
            return Ok(());
        };
        match validator.check(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(InjectError::InvalidInput),
            Err(source) => Err(InjectError::Validator {
                command: validator.command.clone(),
                source,
            }),
        }
    }

    /// Runs extraction and name resolution only.  Returns the record and its expanded
    /// steppings; the database is not modified.
    pub fn lookup_file(&self, path: &Path) -> Result<(ChipRecord, Vec<String>), InjectError> {
        let bsdl = Bsdl::parse(&Self::read_source(path)?)?;
        let record = resolve(&self.db, &self.table, bsdl)?;
        let steppings = stepping::expand(&record.idcode.stepping)?;
        Ok((record, steppings))
    }

    fn run(&self, path: &Path, stage: &mut Stage) -> Result<Outcome, InjectError> {
        *stage = Stage::Validating;
        self.validate(path)?;

        *stage = Stage::Extracting;
        let bsdl = Bsdl::parse(&Self::read_source(path)?)?;
        debug!(idcode = %bsdl.idcode, entity = %bsdl.entity, "extracted");

        *stage = Stage::ResolvingNames;
        let record = resolve(&self.db, &self.table, bsdl)?;
        let mfr = &record.manufacturer;
        let part = &record.part;

        *stage = Stage::ExpandingSteppings;
        let codes = stepping::expand(&record.idcode.stepping)?;
        if !stepping::is_concrete(&record.idcode.stepping) {
            debug!(pattern = %record.idcode.stepping, count = codes.len(), "wildcard stepping");
        }

        *stage = Stage::Merging;
        let steppings_level = Level::steppings(&mfr.folder, &part.folder);
        let mut added = vec![];
        for code in codes {
            if self.db.exists(&steppings_level, &code)? {
                debug!(%code, "stepping already present");
                continue;
            }
            self.db
                .add_manufacturer(&record.idcode.manufacturer, &mfr.folder, &mfr.display)?;
            self.db.add_part(
                &mfr.folder,
                &record.idcode.part,
                &part.folder,
                &part.display,
            )?;
            self.db
                .add_stepping(&mfr.folder, &part.folder, &code, &part.folder)?;
            added.push(code);
        }
        if added.is_empty() {
            *stage = Stage::Done;
            return Ok(Outcome::AlreadyPresent { record });
        }

        *stage = Stage::CopyingArtifact;
        let artifact = steppings_level
            .dir(self.db.root())
            .join(&part.folder);
        fs::copy(path, &artifact).map_err(InjectError::io(&artifact))?;
        info!(artifact = %artifact.display(), steppings = ?added, "registered");

        *stage = Stage::Done;
        Ok(Outcome::Added {
            record,
            artifact,
            steppings: added,
        })
    }

    /// Registers one chip description.  Problems with the file itself come back as
    /// [`Outcome::Skipped`]; `Err` is reserved for fatal failures.
    pub fn inject_file(&self, path: &Path) -> Result<Outcome, InjectError> {
        let mut stage = Stage::Validating;
        match self.run(path, &mut stage) {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_fatal() => {
                error!(path = %path.display(), %stage, "{e}");
                Err(e)
            }
            Err(reason) => {
                warn!(path = %path.display(), %stage, "skipped: {reason}");
                Ok(Outcome::Skipped { stage, reason })
            }
        }
    }

    /// Registers every regular file directly inside `src`, in file name order, calling
    /// `report` after each.  Stops at the first fatal error.
    pub fn inject_dir(
        &self,
        src: &Path,
        mut report: impl FnMut(&Path, &Outcome),
    ) -> Result<Summary, InjectError> {
        let mut summary = Summary::default();
        for entry in WalkDir::new(src)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(src).to_path_buf();
                InjectError::Io {
                    path,
                    source: e.into(),
                }
            })?;
            if !entry.path().is_file() {
                continue;
            }
            let outcome = self.inject_file(entry.path())?;
            summary.record(&outcome);
            report(entry.path(), &outcome);
        }
        Ok(summary)
    }
}
