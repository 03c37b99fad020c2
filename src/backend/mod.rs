// src/backend/mod.rs

//! Pluggable task backend abstraction.
//!
//! The orchestrator talks to a [`TaskBackend`] instead of a concrete remote
//! client. Each call manages exactly one scheduled task on the backend.
//!
//! - [`memory::InMemoryBackend`] keeps everything in process and records
//!   every call, which is what tests assert against.
//! - [`state_file::StateFileBackend`] persists the in-memory state to a TOML
//!   file between invocations of the CLI.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dag::{Definition, Schedule};
use crate::types::{CreateMode, RunState, TaskState};

pub mod memory;
pub mod state_file;

pub use memory::{BackendCall, InMemoryBackend};
pub use state_file::StateFileBackend;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("task '{0}' does not exist")]
    NotFound(String),

    #[error("task '{0}' already exists")]
    Conflict(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound(_))
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Relationship metadata the backend stores alongside a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRelations {
    #[serde(default)]
    pub predecessors: Vec<String>,
    /// Qualified name of the graph's finalizer (set on root tasks only).
    pub finalizer_task: Option<String>,
    /// Root this task finalizes (set on finalizer tasks only).
    pub finalized_root_task: Option<String>,
}

/// A single task as the backend sees it.
///
/// The read-only fields at the bottom (`state`, `task_relations`, ...) are
/// filled in by the backend on `fetch` and ignored on `create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub name: String,
    pub definition: Definition,
    pub warehouse: Option<String>,
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub predecessors: Vec<String>,
    pub condition: Option<String>,
    /// Name of the root task this task finalizes.
    pub finalize: Option<String>,
    pub comment: Option<String>,
    pub error_integration: Option<String>,
    pub allow_overlapping_execution: Option<bool>,
    pub user_task_timeout_ms: Option<u64>,
    pub suspend_task_after_num_failures: Option<u32>,
    pub task_auto_retry_attempts: Option<u32>,
    pub user_task_managed_initial_warehouse_size: Option<String>,
    pub target_completion_interval_minutes: Option<u32>,
    pub serverless_task_min_statement_size: Option<String>,
    pub serverless_task_max_statement_size: Option<String>,
    #[serde(default)]
    pub config: BTreeMap<String, toml::Value>,
    #[serde(default)]
    pub session_parameters: BTreeMap<String, toml::Value>,

    pub state: Option<TaskState>,
    pub task_relations: Option<TaskRelations>,
    pub database_name: Option<String>,
    pub schema_name: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
}

impl TaskDefinition {
    pub fn new(name: impl Into<String>, definition: Definition) -> Self {
        Self {
            name: name.into(),
            definition,
            warehouse: None,
            schedule: None,
            predecessors: Vec::new(),
            condition: None,
            finalize: None,
            comment: None,
            error_integration: None,
            allow_overlapping_execution: None,
            user_task_timeout_ms: None,
            suspend_task_after_num_failures: None,
            task_auto_retry_attempts: None,
            user_task_managed_initial_warehouse_size: None,
            target_completion_interval_minutes: None,
            serverless_task_min_statement_size: None,
            serverless_task_max_statement_size: None,
            config: BTreeMap::new(),
            session_parameters: BTreeMap::new(),
            state: None,
            task_relations: None,
            database_name: None,
            schema_name: None,
            created_on: None,
        }
    }

    /// Name of the finalizer recorded in the relationship metadata, if any.
    pub fn finalizer_task(&self) -> Option<&str> {
        self.task_relations
            .as_ref()
            .and_then(|r| r.finalizer_task.as_deref())
    }

    pub fn is_started(&self) -> bool {
        self.state == Some(TaskState::Started)
    }
}

/// One record from the backend's graph run history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRun {
    pub root_task_name: String,
    pub database_name: String,
    pub schema_name: String,
    pub state: RunState,
    pub first_error_task_name: Option<String>,
    pub first_error_code: Option<i64>,
    pub first_error_message: Option<String>,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub query_start_time: Option<DateTime<Utc>>,
    pub next_scheduled_time: Option<DateTime<Utc>>,
    pub run_id: i64,
    pub graph_version: i64,
}

/// Trait abstracting the remote system that stores and runs tasks.
///
/// Every method is a single synchronous request. Implementations report a
/// missing task with [`BackendError::NotFound`]; the orchestrator relies on
/// that to make teardown idempotent.
pub trait TaskBackend: Send + Sync {
    /// Create one task. `mode` decides what happens if it already exists.
    fn create(&self, task: &TaskDefinition, mode: CreateMode) -> BackendResult<()>;

    fn fetch(&self, name: &str) -> BackendResult<TaskDefinition>;

    /// Run the task now, outside of its schedule.
    fn execute(&self, name: &str, retry_last: bool) -> BackendResult<()>;

    fn suspend(&self, name: &str) -> BackendResult<()>;

    fn resume(&self, name: &str) -> BackendResult<()>;

    fn drop_task(&self, name: &str) -> BackendResult<()>;

    /// The task itself followed by all of its transitive dependents in
    /// creation order, so every task comes after all of its predecessors.
    fn fetch_dependents(&self, name: &str) -> BackendResult<Vec<TaskDefinition>>;

    /// Graph runs that completed recently (the backend picks the window).
    fn list_completed_runs(&self, root_name: &str, error_only: bool) -> BackendResult<Vec<RawRun>>;

    /// Graph runs currently executing or scheduled within the next 8 days.
    fn list_current_runs(&self, root_name: &str) -> BackendResult<Vec<RawRun>>;

    /// Names of root tasks matching a SQL `LIKE` pattern.
    fn list_roots(&self, like: &str) -> BackendResult<Vec<String>>;
}
