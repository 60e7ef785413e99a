use crate::config::{load_curriculum_file, WorkspaceConfig};
use crate::curriculum::SubjectKey;
use crate::error::WorkspaceError;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, required_str, session, workspace_err};
use crate::ipc::types::{AppState, Request, Session};
use crate::store::{open_store, StoreKind};
use serde_json::json;
use std::path::{Path, PathBuf};

/// Loads the workspace configuration, validates the curriculum, and opens
/// the configured store. Nothing is opened if any step fails.
pub fn open_workspace(
    workspace: &Path,
    store_override: Option<StoreKind>,
    curriculum_path: Option<&Path>,
) -> Result<Session, WorkspaceError> {
    let cfg = WorkspaceConfig::load(workspace)?;
    let curriculum = match curriculum_path {
        Some(p) => load_curriculum_file(p)?,
        None => cfg.curriculum()?,
    };
    let kind = store_override.unwrap_or(cfg.store);
    let store = open_store(kind, workspace, &curriculum)?;

    tracing::info!(
        workspace = %workspace.display(),
        store = kind.as_str(),
        units = curriculum.units().len(),
        subjects = curriculum.subject_keys().len(),
        "workspace opened"
    );
    Ok(Session { curriculum, store })
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "store": state.session.as_ref().map(|s| s.store.kind().as_str()),
        }),
    )
}

fn handle_workspace_select(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let path = PathBuf::from(required_str(req, "path")?);
    let store_override = match optional_str(req, "store") {
        None => None,
        Some(s) => Some(StoreKind::parse(s).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                "store must be one of: sqlite, csv",
                Some(json!({ "store": s })),
            )
        })?),
    };
    let curriculum_path = optional_str(req, "curriculumPath").map(PathBuf::from);

    // A failed selection leaves no workspace open.
    state.workspace = None;
    state.session = None;

    let session = open_workspace(&path, store_override, curriculum_path.as_deref())
        .map_err(|e| workspace_err(req, e))?;
    let result = json!({
        "workspacePath": path.to_string_lossy(),
        "store": session.store.kind().as_str(),
        "unitCount": session.curriculum.units().len(),
        "subjectCount": session.curriculum.subject_keys().len(),
    });
    state.workspace = Some(path);
    state.session = Some(session);
    Ok(ok(&req.id, result))
}

fn handle_curriculum_get(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let session = session(state, req)?;
    let units: Vec<serde_json::Value> = session
        .curriculum
        .units()
        .iter()
        .map(|u| {
            json!({
                "id": u.id,
                "coefficient": u.coefficient,
                "subjects": u.subjects.iter().map(|s| json!({
                    "id": s.id,
                    "coefficient": s.coefficient,
                    "subjectKey": SubjectKey::new(&u.id, &s.id).column(),
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    Ok(ok(
        &req.id,
        json!({
            "units": units,
            "subjectKeys": session.curriculum.columns(),
        }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "health" => return Some(handle_health(state, req)),
        "workspace.select" => handle_workspace_select(state, req),
        "curriculum.get" => handle_curriculum_get(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}
