//! The external grade-table store.
//!
//! A store only knows how to read and write a whole [`GradeTable`]. Each call
//! is atomic on its own; a read followed by a write is not.

pub mod csv_file;
mod sheet;
pub mod sqlite;
pub mod workbook;

use crate::curriculum::Curriculum;
use crate::error::StoreError;
use crate::table::GradeTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub trait GradeStore {
    fn kind(&self) -> StoreKind;

    /// Whole table. A store that was never written returns an empty table.
    fn read(&self) -> Result<GradeTable, StoreError>;

    /// Replaces the stored table. On error the store keeps its previous
    /// contents.
    fn write(&self, table: &GradeTable) -> Result<(), StoreError>;

    /// Files holding the store's data, for workspace backups.
    fn files(&self) -> Vec<PathBuf>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Sqlite,
    Csv,
}

impl StoreKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(StoreKind::Sqlite),
            "csv" => Some(StoreKind::Csv),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::Sqlite => "sqlite",
            StoreKind::Csv => "csv",
        }
    }
}

pub fn open_store(
    kind: StoreKind,
    workspace: &Path,
    curriculum: &Curriculum,
) -> Result<Box<dyn GradeStore>, StoreError> {
    std::fs::create_dir_all(workspace)?;
    match kind {
        StoreKind::Sqlite => Ok(Box::new(sqlite::SqliteStore::open(workspace)?)),
        StoreKind::Csv => Ok(Box::new(csv_file::CsvStore::new(
            workspace.join(csv_file::CSV_FILE_NAME),
            curriculum.columns(),
        ))),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }
}
