//! Error types for the timetable core and its data store.

use std::fmt;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by the external data store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Write error: {0}")]
    Write(String),
}

/// Which catalog map an id was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Batch,
    Faculty,
    Classroom,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Batch => write!(f, "batch"),
            EntityKind::Faculty => write!(f, "faculty"),
            EntityKind::Classroom => write!(f, "classroom"),
        }
    }
}

/// Errors surfaced by the generate/validate/project pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TimetableError {
    #[error("failed to fetch data: {0}")]
    Fetch(#[from] StoreError),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl TimetableError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        TimetableError::NotFound { kind, id: id.into() }
    }
}
