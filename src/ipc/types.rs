use crate::curriculum::Curriculum;
use crate::store::GradeStore;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// An open workspace: the curriculum validated at open time and the store
/// selected by configuration.
pub struct Session {
    pub curriculum: Curriculum,
    pub store: Box<dyn GradeStore>,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub session: Option<Session>,
}
