// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Structural problems with a graph (cycles, duplicate names, finalizer
//! misuse, cross-graph edges) are reported before any backend call is made.
//! Backend failures are carried through unchanged in [`TaskdagError::Backend`].

use thiserror::Error;

use crate::backend::BackendError;

#[derive(Error, Debug)]
pub enum TaskdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("Duplicate task: {0}")]
    DuplicateTask(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskdagError {
    /// True when the error is a backend "not found" response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskdagError::Backend(e) if e.is_not_found())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskdagError>;
