use thiserror::Error;

/// Curriculum problems. Raised once when a workspace is opened, never while
/// aggregating.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("curriculum has no teaching unit")]
    NoUnits,

    #[error("unit {unit:?} has no subject")]
    EmptyUnit { unit: String },

    #[error("empty identifier in {context}")]
    EmptyIdentifier { context: String },

    #[error("identifier {id:?} contains the reserved separator '|'")]
    ReservedSeparator { id: String },

    #[error("coefficient for {context} must be > 0 (got {value})")]
    NonPositiveCoefficient { context: String, value: f64 },

    #[error("duplicate unit {unit:?}")]
    DuplicateUnit { unit: String },

    #[error("duplicate subject key {key:?}")]
    DuplicateSubjectKey { key: String },

    #[error("failed to read {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Malformed(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        "config_invalid"
    }
}

/// Per-cell problems.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("grade {value} is outside [0, 20]")]
    OutOfRange { value: f64 },

    #[error("grade {raw:?} is not a number")]
    NonNumeric { raw: String },

    #[error("unknown subject key {key:?}")]
    UnknownSubject { key: String },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::OutOfRange { .. } => "out_of_range",
            ValidationError::NonNumeric { .. } => "non_numeric",
            ValidationError::UnknownSubject { .. } => "unknown_subject",
        }
    }
}

/// Row-level problems returned by the upsert gateway. No side effect occurs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    #[error("student {name:?} already exists")]
    DuplicateStudent { name: String },

    #[error("student {name:?} does not exist")]
    UnknownStudent { name: String },

    #[error("student name must not be empty")]
    EmptyName,
}

impl StateError {
    pub fn code(&self) -> &'static str {
        match self {
            StateError::DuplicateStudent { .. } => "duplicate_student",
            StateError::UnknownStudent { .. } => "unknown_student",
            StateError::EmptyName => "empty_name",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::State(e) => e.code(),
            GatewayError::Validation(e) => e.code(),
        }
    }
}

/// Failures of the external table store. Surfaced to the caller unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt store: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        "store_failed"
    }
}

/// Opening a workspace fails on either its configuration or its store.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkspaceError {
    pub fn code(&self) -> &'static str {
        match self {
            WorkspaceError::Config(e) => e.code(),
            WorkspaceError::Store(e) => e.code(),
        }
    }
}
