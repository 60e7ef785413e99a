use crate::error::ValidationError;
use std::collections::{BTreeMap, BTreeSet};

pub const MIN_GRADE: f64 = 0.0;
pub const MAX_GRADE: f64 = 20.0;

/// Raw content of a grade cell as held by the store. Validation happens when
/// the cell is read as a grade, never when it is loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    /// Interprets free-form cell text: blank is absent, anything that parses
    /// as a number is numeric, the rest is kept verbatim.
    pub fn from_raw(raw: &str) -> Option<Cell> {
        let t = raw.trim();
        if t.is_empty() {
            return None;
        }
        match parse_number(t) {
            Some(v) => Some(Cell::Number(v)),
            None => Some(Cell::Text(raw.to_string())),
        }
    }

    /// Text form written back to text stores. Numbers use the shortest
    /// representation that parses back to the same value.
    pub fn to_raw(&self) -> String {
        match self {
            Cell::Number(v) => v.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }
}

/// Columns of one student's row; `None` is a known but ungraded column.
pub type Row = BTreeMap<String, Option<Cell>>;

/// Sparse student × subject-key table. Student names (see [`student_name`])
/// are the identity and are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeTable {
    rows: BTreeMap<String, Row>,
}

impl GradeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn contains_student(&self, name: &str) -> bool {
        self.rows.contains_key(name)
    }

    /// Student names in ascending order.
    pub fn students(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &Row)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn row(&self, name: &str) -> Option<&Row> {
        self.rows.get(name)
    }

    pub fn cell(&self, name: &str, column: &str) -> Option<&Cell> {
        self.row(name)?.get(column)?.as_ref()
    }

    /// Union of the columns used by any row.
    pub fn columns(&self) -> BTreeSet<&str> {
        self.rows
            .values()
            .flat_map(|r| r.keys().map(String::as_str))
            .collect()
    }

    /// Replaces (or adds) a whole row.
    pub fn insert_row(&mut self, name: impl Into<String>, row: Row) {
        self.rows.insert(name.into(), row);
    }

    /// Sets one cell of an existing row. Returns false if the row is missing.
    pub fn set_cell(&mut self, name: &str, column: &str, value: Option<Cell>) -> bool {
        match self.rows.get_mut(name) {
            Some(row) => {
                row.insert(column.to_string(), value);
                true
            }
            None => false,
        }
    }
}

/// Canonical form of a student name. Every store and the gateway key rows by
/// this form, so names that differ only by surrounding whitespace collide.
pub fn student_name(raw: &str) -> &str {
    raw.trim()
}

/// Reads a cell as a grade in [0, 20].
pub fn parse_grade(cell: &Cell) -> Result<f64, ValidationError> {
    let value = match cell {
        Cell::Number(v) => *v,
        Cell::Text(s) => parse_number(s.trim()).ok_or_else(|| ValidationError::NonNumeric {
            raw: s.clone(),
        })?,
    };
    check_range(value)
}

pub fn check_range(value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && (MIN_GRADE..=MAX_GRADE).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange { value })
    }
}

// Accepts both '.' and ',' as the decimal separator ("12,5"). "nan" and
// "inf" spellings stay text.
fn parse_number(t: &str) -> Option<f64> {
    let parsed = match t.parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) if t.matches(',').count() == 1 && !t.contains('.') => {
            t.replace(',', ".").parse::<f64>().ok()
        }
        Err(_) => None,
    };
    parsed.filter(|v| v.is_finite())
}
