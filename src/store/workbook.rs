//! Spreadsheet workbooks (`.xlsx`, `.xls`, `.ods`) as an import source. Only
//! the first sheet is read, laid out like a CSV grade sheet.

use super::sheet::SheetBuilder;
use crate::error::StoreError;
use crate::table::{Cell, GradeTable};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

pub fn read_workbook(path: &Path) -> Result<GradeTable, StoreError> {
    let mut workbook = open_workbook_auto(path)?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(GradeTable::new());
    };
    let range = range?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(GradeTable::new());
    };
    let Some(mut builder) = SheetBuilder::new(header.iter().map(|d| d.to_string()))? else {
        return Ok(GradeTable::new());
    };
    for (line, row) in rows.enumerate() {
        let name = row.first().map(|d| d.to_string()).unwrap_or_default();
        builder.push_row(line + 2, &name, row.iter().skip(1).map(to_cell))?;
    }
    Ok(builder.finish())
}

// Numeric cells keep their value; everything else goes through the same
// text rules as a CSV cell.
fn to_cell(data: &Data) -> Option<Cell> {
    match data {
        Data::Empty => None,
        Data::Float(v) if v.is_finite() => Some(Cell::Number(*v)),
        Data::Int(v) => Some(Cell::Number(*v as f64)),
        Data::String(s) => Cell::from_raw(s),
        other => Some(Cell::Text(other.to_string())),
    }
}
