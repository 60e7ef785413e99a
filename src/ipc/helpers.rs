use crate::curriculum::SubjectKey;
use crate::error::{GatewayError, StoreError, WorkspaceError};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request, Session};
use crate::table::{student_name, Cell};
use serde_json::json;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// `name` param in the canonical form the gateway keys rows by.
pub fn student_param(req: &Request) -> Result<String, serde_json::Value> {
    required_str(req, "name").map(|n| student_name(&n).to_string())
}

pub fn optional_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn session<'a>(state: &'a AppState, req: &Request) -> Result<&'a Session, serde_json::Value> {
    state
        .session
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Column named either by `subjectKey` ("unit|subject") or by the pair
/// `unit` + `subject`.
pub fn subject_column(req: &Request) -> Result<String, serde_json::Value> {
    if let Some(key) = req.params.get("subjectKey").and_then(|v| v.as_str()) {
        return Ok(key.to_string());
    }
    match (
        req.params.get("unit").and_then(|v| v.as_str()),
        req.params.get("subject").and_then(|v| v.as_str()),
    ) {
        (Some(unit), Some(subject)) => Ok(SubjectKey::new(unit, subject).column()),
        _ => Err(err(
            &req.id,
            "bad_params",
            "missing subjectKey (or unit + subject)",
            None,
        )),
    }
}

/// Grade value as sent by the form: a JSON number, or text to be parsed.
pub fn grade_value(req: &Request) -> Result<Cell, serde_json::Value> {
    match req.params.get("value") {
        None => Err(err(&req.id, "bad_params", "missing value", None)),
        Some(v) => Ok(match v {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => Cell::Number(f),
                None => Cell::Text(n.to_string()),
            },
            serde_json::Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }),
    }
}

pub fn store_err(req: &Request, e: StoreError) -> serde_json::Value {
    tracing::error!(method = %req.method, error = %e, "store call failed");
    err(&req.id, e.code(), e.to_string(), None)
}

pub fn gateway_err(req: &Request, e: GatewayError) -> serde_json::Value {
    let details = match &e {
        GatewayError::Validation(v) => Some(json!({ "kind": "validation", "code": v.code() })),
        GatewayError::State(s) => Some(json!({ "kind": "state", "code": s.code() })),
    };
    err(&req.id, e.code(), e.to_string(), details)
}

pub fn workspace_err(req: &Request, e: WorkspaceError) -> serde_json::Value {
    tracing::error!(error = %e, "workspace could not be opened");
    err(&req.id, e.code(), e.to_string(), None)
}
