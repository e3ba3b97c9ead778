//! Canonical names.  Whatever the database already says about a code wins; the reference
//! table and the entity name only fill in for codes it has never seen.

use tracing::debug;

use crate::bsdl::{Bsdl, Idcode};
use crate::error::InjectError;
use crate::index::{Database, Level};
use crate::reftable::{ReferenceTable, folder_name};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Name {
    pub folder: String,
    pub display: String,
    /// Taken from an existing database record.
    pub existing: bool,
}

/// A chip description with its names resolved against a database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChipRecord {
    pub idcode: Idcode,
    pub manufacturer: Name,
    pub part: Name,
}

/// Picks a folder for a code the level does not know yet.  A folder already claimed by
/// another record, or already on disk, gets the code appended.
fn unique_folder(
    db: &Database,
    level: &Level,
    base: String,
    code: &str,
) -> Result<String, InjectError> {
    if !db.folder_in_use(level, &base)? {
        return Ok(base);
    }
    let mut folder = format!("{base}_{code}");
    let mut n = 2;
    while db.folder_in_use(level, &folder)? {
        folder = format!("{base}_{code}_{n}");
        n += 1;
    }
    debug!(%base, %folder, code, "folder name taken");
    Ok(folder)
}

pub fn resolve_manufacturer(
    db: &Database,
    table: &ReferenceTable,
    id: &str,
) -> Result<Name, InjectError> {
    if let Some(rec) = db.lookup(&Level::Manufacturers, id)? {
        debug!(id, folder = %rec.folder, "manufacturer known to database");
        return Ok(Name {
            folder: rec.folder,
            display: rec.display,
            existing: true,
        });
    }
    let Some(name) = table.lookup(id) else {
        return Err(InjectError::UnresolvedManufacturer(id.to_string()));
    };
    let folder = folder_name(name);
    if folder.is_empty() {
        return Err(InjectError::UnresolvedManufacturer(id.to_string()));
    }
    let folder = unique_folder(db, &Level::Manufacturers, folder, id)?;
    debug!(id, %folder, name, "manufacturer taken from reference table");
    Ok(Name {
        folder,
        display: name.to_string(),
        existing: false,
    })
}

pub fn resolve_part(
    db: &Database,
    manufacturer: &str,
    code: &str,
    entity: &str,
) -> Result<Name, InjectError> {
    if let Some(rec) = db.lookup(&Level::parts(manufacturer), code)? {
        debug!(code, folder = %rec.folder, "part known to database");
        return Ok(Name {
            folder: rec.folder,
            display: rec.display,
            existing: true,
        });
    }
    let level = Level::parts(manufacturer);
    Ok(Name {
        folder: unique_folder(db, &level, entity.to_lowercase(), code)?,
        display: entity.to_uppercase(),
        existing: false,
    })
}

pub fn resolve(
    db: &Database,
    table: &ReferenceTable,
    bsdl: Bsdl,
) -> Result<ChipRecord, InjectError> {
    let manufacturer = resolve_manufacturer(db, table, &bsdl.idcode.manufacturer)?;
    let part = resolve_part(db, &manufacturer.folder, &bsdl.idcode.part, &bsdl.entity)?;
    Ok(ChipRecord {
        idcode: bsdl.idcode,
        manufacturer,
        part,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_database_wins() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path());
        db.add_manufacturer("00000100000", "acme", "Acme").unwrap();
        let table = ReferenceTable::parse("00000100000 ACME_CORP\n");
        let name = resolve_manufacturer(&db, &table, "00000100000").unwrap();
        assert_eq!(name.folder, "acme");
        assert!(name.existing);
    }

    #[test]
    fn test_reference_fallback() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path());
        let table = ReferenceTable::parse("00000100000 STMicroelectronics\n");
        let name = resolve_manufacturer(&db, &table, "00000100000").unwrap();
        assert_eq!(
            name,
            Name {
                folder: "stmicroelectronics".to_string(),
                display: "STMicroelectronics".to_string(),
                existing: false,
            }
        );
        assert_matches!(
            resolve_manufacturer(&db, &table, "00000000001"),
            Err(InjectError::UnresolvedManufacturer(id)) if id == "00000000001"
        );
    }

    #[test]
    fn test_part() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path());
        db.add_manufacturer("00000100000", "stm", "STMicroelectronics")
            .unwrap();
        db.add_part("stm", "0110010000010100", "stm32f1", "STM32F1")
            .unwrap();
        let known = resolve_part(&db, "stm", "0110010000010100", "STM32F103_LQFP48").unwrap();
        assert_eq!(known.folder, "stm32f1");
        assert!(known.existing);
        let new = resolve_part(&db, "stm", "0110010000010000", "STM32F100_LQFP48").unwrap();
        assert_eq!(new.folder, "stm32f100_lqfp48");
        assert_eq!(new.display, "STM32F100_LQFP48");
        assert!(!new.existing);
        // parts are scoped by manufacturer
        let other = resolve_part(&db, "intel", "0110010000010100", "Chip").unwrap();
        assert_eq!(other.folder, "chip");
    }

    #[test]
    fn test_part_folder_taken() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path());
        db.add_manufacturer("00000000001", "amd", "AMD").unwrap();
        db.add_part("amd", "0000000000000001", "chip", "CHIP").unwrap();
        let name = resolve_part(&db, "amd", "0000000000000010", "chip").unwrap();
        assert_eq!(name.folder, "chip_0000000000000010");
        assert_eq!(name.display, "CHIP");
        db.add_part("amd", "0000000000000010", &name.folder, &name.display)
            .unwrap();
        // a leftover directory with no record also counts as taken
        std::fs::create_dir(dir.path().join("amd/other")).unwrap();
        let name = resolve_part(&db, "amd", "0000000000000011", "OTHER").unwrap();
        assert_eq!(name.folder, "other_0000000000000011");
    }

    #[test]
    fn test_manufacturer_folder_taken() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path());
        db.add_manufacturer("00000100000", "acme", "Acme").unwrap();
        let table = ReferenceTable::parse("00000000001 ACME Industries\n");
        let name = resolve_manufacturer(&db, &table, "00000000001").unwrap();
        assert_eq!(name.folder, "acme_00000000001");
        assert_eq!(name.display, "ACME Industries");
        assert!(!name.existing);
    }
}
