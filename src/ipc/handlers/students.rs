use crate::gateway;
use crate::ipc::error::ok;
use crate::ipc::helpers::{gateway_err, session, store_err, student_param};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_students_list(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let session = session(state, req)?;
    let table = session.store.read().map_err(|e| store_err(req, e))?;
    let students: Vec<&str> = table.students().collect();
    Ok(ok(
        &req.id,
        json!({ "students": students, "count": students.len() }),
    ))
}

fn handle_students_create(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let session = session(state, req)?;
    let name = student_param(req)?;

    let table = session.store.read().map_err(|e| store_err(req, e))?;
    let updated = gateway::create_student(&session.curriculum, &table, &name)
        .map_err(|e| gateway_err(req, e))?;
    session
        .store
        .write(&updated)
        .map_err(|e| store_err(req, e))?;

    tracing::info!(student = %name, "student created");
    Ok(ok(
        &req.id,
        json!({ "name": name, "studentCount": updated.len() }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "students.list" => handle_students_list(state, req),
        "students.create" => handle_students_create(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}
