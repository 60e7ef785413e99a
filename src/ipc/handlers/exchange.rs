use crate::calc;
use crate::error::StoreError;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::report::warnings_json;
use crate::ipc::helpers::{required_str, session, store_err};
use crate::ipc::types::{AppState, Request};
use crate::store::{csv_file, workbook};
use crate::table::GradeTable;
use serde_json::json;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Replaces the stored table with a parsed grade sheet (`name,<unit|subject>...`).
fn import_sheet(
    state: &mut AppState,
    req: &Request,
    read: impl FnOnce(&Path) -> Result<GradeTable, StoreError>,
) -> Result<serde_json::Value, serde_json::Value> {
    let session = session(state, req)?;
    let in_path = PathBuf::from(required_str(req, "inPath")?);
    if !in_path.is_file() {
        return Err(err(
            &req.id,
            "not_found",
            "sheet file not found",
            Some(json!({ "path": in_path.to_string_lossy() })),
        ));
    }

    let table = read(&in_path).map_err(|e| {
        let code = match &e {
            StoreError::Io(_) => "io_failed",
            _ => "bad_params",
        };
        err(
            &req.id,
            code,
            e.to_string(),
            Some(json!({ "path": in_path.to_string_lossy() })),
        )
    })?;
    if table.is_empty() {
        tracing::warn!(path = %in_path.display(), "imported sheet has no student rows");
    }
    session.store.write(&table).map_err(|e| store_err(req, e))?;

    // Bad cells are imported as-is; they surface here and in every report.
    let report = calc::compute_report(&session.curriculum, &table);
    tracing::info!(
        rows = table.len(),
        warnings = report.warnings.len(),
        path = %in_path.display(),
        "grade table imported"
    );
    Ok(ok(
        &req.id,
        json!({
            "studentCount": table.len(),
            "warnings": warnings_json(&report.warnings),
        }),
    ))
}

fn handle_exchange_import_csv(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    import_sheet(state, req, |path| csv_file::read_table(File::open(path)?))
}

fn handle_exchange_import_xlsx(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    import_sheet(state, req, workbook::read_workbook)
}

fn handle_exchange_export_csv(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let session = session(state, req)?;
    let out_path = PathBuf::from(required_str(req, "outPath")?);
    let table = session.store.read().map_err(|e| store_err(req, e))?;

    let io_err = |message: String| {
        err(
            &req.id,
            "io_failed",
            message,
            Some(json!({ "path": out_path.to_string_lossy() })),
        )
    };
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(e.to_string()))?;
    }
    let file = File::create(&out_path).map_err(|e| io_err(e.to_string()))?;
    csv_file::write_table(file, &table, &session.curriculum.columns())
        .map_err(|e| io_err(e.to_string()))?;

    Ok(ok(
        &req.id,
        json!({ "path": out_path.to_string_lossy(), "studentCount": table.len() }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "exchange.importCsv" => handle_exchange_import_csv(state, req),
        "exchange.importXlsx" => handle_exchange_import_xlsx(state, req),
        "exchange.exportCsv" => handle_exchange_export_csv(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}
