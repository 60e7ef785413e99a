//! Row assembly shared by the sheet formats (CSV and workbooks): a name
//! column first, then one column per subject key.

use crate::error::StoreError;
use crate::table::{student_name, Cell, GradeTable, Row};

/// Accepted spellings of the student-name header (first column).
pub const NAME_HEADERS: [&str; 3] = ["name", "nom", "student"];

pub struct SheetBuilder {
    columns: Vec<String>,
    table: GradeTable,
}

impl SheetBuilder {
    /// `headers` is the whole header line, name column included. `Ok(None)`
    /// for a sheet without any header.
    pub fn new<I, S>(headers: I) -> Result<Option<Self>, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut headers = headers.into_iter();
        let Some(first) = headers.next() else {
            return Ok(None);
        };
        let first = first.as_ref().trim();
        if !NAME_HEADERS.iter().any(|h| first.eq_ignore_ascii_case(h)) {
            return Err(StoreError::Corrupt(format!(
                "first column must be the student name, found {:?}",
                first
            )));
        }
        Ok(Some(Self {
            columns: headers.map(|h| h.as_ref().trim().to_string()).collect(),
            table: GradeTable::new(),
        }))
    }

    /// Adds one student line. `cells` follow the header order; missing
    /// trailing cells are absent. Lines with an empty name are skipped.
    pub fn push_row<I>(&mut self, line: usize, name: &str, cells: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = Option<Cell>>,
    {
        let name = student_name(name);
        if name.is_empty() {
            tracing::warn!(line, "skipping grade line without a student name");
            return Ok(());
        }
        if self.table.contains_student(name) {
            return Err(StoreError::Corrupt(format!(
                "student {:?} appears twice",
                name
            )));
        }
        let mut cells = cells.into_iter();
        let row: Row = self
            .columns
            .iter()
            .map(|col| (col.clone(), cells.next().flatten()))
            .collect();
        self.table.insert_row(name, row);
        Ok(())
    }

    pub fn finish(self) -> GradeTable {
        self.table
    }
}
