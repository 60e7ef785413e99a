use crate::gateway;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    gateway_err, grade_value, session, store_err, student_param, subject_column,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_grades_record(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let session = session(state, req)?;
    let name = student_param(req)?;
    let column = subject_column(req)?;
    let value = grade_value(req)?;

    let table = session.store.read().map_err(|e| store_err(req, e))?;
    let updated = gateway::record_grade(&session.curriculum, &table, &name, &column, &value)
        .map_err(|e| gateway_err(req, e))?;
    session
        .store
        .write(&updated)
        .map_err(|e| store_err(req, e))?;

    let stored = gateway::grade_at(&session.curriculum, &updated, &name, &column)
        .map_err(|e| gateway_err(req, e))?;
    tracing::info!(student = %name, subject = %column, "grade recorded");
    Ok(ok(
        &req.id,
        json!({ "name": name, "subjectKey": column, "value": stored }),
    ))
}

fn handle_grades_get(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let session = session(state, req)?;
    let name = student_param(req)?;
    let column = subject_column(req)?;

    let table = session.store.read().map_err(|e| store_err(req, e))?;
    let value = gateway::grade_at(&session.curriculum, &table, &name, &column)
        .map_err(|e| gateway_err(req, e))?;
    Ok(ok(
        &req.id,
        json!({ "name": name, "subjectKey": column, "value": value }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "grades.record" => handle_grades_record(state, req),
        "grades.get" => handle_grades_get(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}
