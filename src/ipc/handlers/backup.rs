use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::core::open_workspace;
use crate::ipc::helpers::{required_str, session, workspace_err};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_backup_export_workspace_bundle(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let out_path = required_str(req, "outPath")?;
    let session = session(state, req)?;
    let Some(workspace_path) = state.workspace.clone() else {
        return Err(err(&req.id, "no_workspace", "select a workspace first", None));
    };

    let out = PathBuf::from(&out_path);
    let export = backup::export_workspace_bundle(&workspace_path, &session.store.files(), &out)
        .map_err(|e| {
            err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": out_path })),
            )
        })?;

    tracing::info!(path = %out_path, entries = export.entry_count, "workspace bundle exported");
    Ok(ok(
        &req.id,
        json!({
            "path": out_path,
            "bundleFormat": export.bundle_format,
            "entryCount": export.entry_count
        }),
    ))
}

fn handle_backup_import_workspace_bundle(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let in_path = required_str(req, "inPath")?;
    let workspace_path = req
        .params
        .get("workspacePath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .or_else(|| state.workspace.clone());
    let Some(workspace_path) = workspace_path else {
        return Err(err(&req.id, "no_workspace", "select a workspace first", None));
    };

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return Err(err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        ));
    }

    // Drop open handles before replacing files.
    state.session = None;
    state.workspace = None;

    let import = backup::import_workspace_bundle(&src, &workspace_path).map_err(|e| {
        err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": in_path })),
        )
    })?;

    let session = open_workspace(&workspace_path, None, None).map_err(|e| workspace_err(req, e))?;
    let store = session.store.kind().as_str();
    state.workspace = Some(workspace_path.clone());
    state.session = Some(session);

    Ok(ok(
        &req.id,
        json!({
            "workspacePath": workspace_path.to_string_lossy(),
            "bundleFormatDetected": import.bundle_format_detected,
            "restoredFiles": import.restored_files,
            "store": store,
        }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "backup.exportWorkspaceBundle" => handle_backup_export_workspace_bundle(state, req),
        "backup.importWorkspaceBundle" => handle_backup_import_workspace_bundle(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}
