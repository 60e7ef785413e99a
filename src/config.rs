use crate::curriculum::{Curriculum, CurriculumUnit};
use crate::error::ConfigError;
use crate::store::StoreKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "gradebook.json";

/// Curriculum as written in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurriculumConfig {
    pub units: Vec<CurriculumUnit>,
}

impl CurriculumConfig {
    pub fn build(self) -> Result<Curriculum, ConfigError> {
        Curriculum::new(self.units)
    }
}

/// `<workspace>/gradebook.json`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub store: StoreKind,
    #[serde(default)]
    pub curriculum: Option<CurriculumConfig>,
}

impl WorkspaceConfig {
    /// Reads the workspace config; a missing file yields the defaults.
    pub fn load(workspace: &Path) -> Result<Self, ConfigError> {
        let path = workspace.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        read_json(&path)
    }

    /// Validated curriculum, falling back to the built-in one.
    pub fn curriculum(&self) -> Result<Curriculum, ConfigError> {
        match &self.curriculum {
            Some(c) => c.clone().build(),
            None => Ok(Curriculum::builtin()),
        }
    }
}

/// Loads a standalone curriculum file (`{"units": [...]}`).
pub fn load_curriculum_file(path: &Path) -> Result<Curriculum, ConfigError> {
    read_json::<CurriculumConfig>(path)?.build()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.to_string_lossy().to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| {
        ConfigError::Malformed(format!("{}: {}", path.to_string_lossy(), e))
    })
}
