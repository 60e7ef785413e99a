use super::sheet::{SheetBuilder, NAME_HEADERS};
use super::{GradeStore, StoreKind};
use crate::error::StoreError;
use crate::table::{Cell, GradeTable};
use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const CSV_FILE_NAME: &str = "grades.csv";

/// Grade table kept as a CSV sheet: `name,<unit|subject>...`, one student
/// per line, empty cell for "not graded".
pub struct CsvStore {
    path: PathBuf,
    columns: Vec<String>,
}

impl CsvStore {
    /// `columns` fixes the order of known columns in the written sheet.
    pub fn new(path: PathBuf, columns: Vec<String>) -> Self {
        Self { path, columns }
    }
}

impl GradeStore for CsvStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Csv
    }

    fn read(&self) -> Result<GradeTable, StoreError> {
        if !self.path.is_file() {
            return Ok(GradeTable::new());
        }
        let file = std::fs::File::open(&self.path)?;
        read_table(file)
    }

    fn write(&self, table: &GradeTable) -> Result<(), StoreError> {
        let tmp = tmp_path(&self.path);
        let result = std::fs::File::create(&tmp)
            .map_err(StoreError::from)
            .and_then(|f| write_table(f, table, &self.columns));
        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(rows = table.len(), path = %self.path.display(), "csv store written");
        Ok(())
    }

    fn files(&self) -> Vec<PathBuf> {
        if self.path.is_file() {
            vec![self.path.clone()]
        } else {
            Vec::new()
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".writing");
    path.with_file_name(name)
}

/// Parses a grade sheet. Every header column becomes a key of every row;
/// blank cells are absent. Lines with an empty name are skipped.
pub fn read_table<R: Read>(reader: R) -> Result<GradeTable, StoreError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let Some(mut builder) = SheetBuilder::new(rdr.headers()?.iter())? else {
        return Ok(GradeTable::new());
    };
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        builder.push_row(
            line + 2,
            record.get(0).unwrap_or(""),
            record.iter().skip(1).map(Cell::from_raw),
        )?;
    }
    Ok(builder.finish())
}

/// Writes a grade sheet. `known_columns` come first in the given order, other
/// columns present in the table follow in sorted order.
pub fn write_table<W: Write>(
    writer: W,
    table: &GradeTable,
    known_columns: &[String],
) -> Result<(), StoreError> {
    let known: BTreeSet<&str> = known_columns.iter().map(String::as_str).collect();
    let mut columns: Vec<&str> = known_columns.iter().map(String::as_str).collect();
    columns.extend(table.columns().into_iter().filter(|c| !known.contains(c)));

    let mut wtr = csv::Writer::from_writer(writer);
    let mut header = vec![NAME_HEADERS[0]];
    header.extend(columns.iter().copied());
    wtr.write_record(&header)?;

    for (name, row) in table.rows() {
        let mut record = Vec::with_capacity(columns.len() + 1);
        record.push(name.to_string());
        for col in &columns {
            let raw = row
                .get(*col)
                .and_then(|c| c.as_ref())
                .map(Cell::to_raw)
                .unwrap_or_default();
            record.push(raw);
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}
