//! Pure upsert operations on a grade table.
//!
//! Callers read the whole table from the store, apply one operation, and
//! write the whole table back. Two sessions working from stale reads will
//! overwrite each other's cells (last writer wins); nothing here guards
//! against that.

use crate::curriculum::Curriculum;
use crate::error::{GatewayError, StateError, ValidationError};
use crate::table::{parse_grade, student_name, Cell, GradeTable, Row};

/// Adds an empty row for `name` with every curriculum column present and
/// ungraded. Surrounding whitespace is not part of the name.
pub fn create_student(
    curriculum: &Curriculum,
    table: &GradeTable,
    name: &str,
) -> Result<GradeTable, GatewayError> {
    let name = student_name(name);
    if name.is_empty() {
        return Err(StateError::EmptyName.into());
    }
    if table.contains_student(name) {
        return Err(StateError::DuplicateStudent {
            name: name.to_string(),
        }
        .into());
    }

    let row: Row = curriculum.columns().into_iter().map(|c| (c, None)).collect();
    let mut updated = table.clone();
    updated.insert_row(name, row);
    Ok(updated)
}

/// Replaces a single cell. Never creates a student row.
pub fn record_grade(
    curriculum: &Curriculum,
    table: &GradeTable,
    name: &str,
    column: &str,
    value: &Cell,
) -> Result<GradeTable, GatewayError> {
    let name = student_name(name);
    if !table.contains_student(name) {
        return Err(StateError::UnknownStudent {
            name: name.to_string(),
        }
        .into());
    }
    let Some(key) = curriculum.key_for_column(column) else {
        return Err(ValidationError::UnknownSubject {
            key: column.to_string(),
        }
        .into());
    };
    let grade = parse_grade(value)?;

    let mut updated = table.clone();
    updated.set_cell(name, &key.column(), Some(Cell::Number(grade)));
    Ok(updated)
}

/// Reads a stored grade back. `Ok(None)` means the cell is empty.
pub fn grade_at(
    curriculum: &Curriculum,
    table: &GradeTable,
    name: &str,
    column: &str,
) -> Result<Option<f64>, GatewayError> {
    let name = student_name(name);
    if !table.contains_student(name) {
        return Err(StateError::UnknownStudent {
            name: name.to_string(),
        }
        .into());
    }
    if curriculum.key_for_column(column).is_none() {
        return Err(ValidationError::UnknownSubject {
            key: column.to_string(),
        }
        .into());
    }
    match table.cell(name, column) {
        Some(cell) => Ok(Some(parse_grade(cell)?)),
        None => Ok(None),
    }
}
