// src/ops/runs.rs

use std::fmt;

use chrono::{DateTime, Utc};

use super::{DagOperation, DagTarget};
use crate::backend::{RawRun, TaskBackend};
use crate::errors::Result;
use crate::types::RunState;

/// One run of a task graph, as reported by the backend's run history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagRun {
    /// Name of the root task, which is also the graph name.
    pub dag_name: String,
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

impl From<RawRun> for DagRun {
    fn from(raw: RawRun) -> Self {
        Self {
            dag_name: raw.root_task_name,
            database_name: raw.database_name,
            schema_name: raw.schema_name,
            state: raw.state,
            first_error_task_name: raw.first_error_task_name,
            first_error_code: raw.first_error_code,
            first_error_message: raw.first_error_message,
            scheduled_time: raw.scheduled_time,
            query_start_time: raw.query_start_time,
            next_scheduled_time: raw.next_scheduled_time,
            run_id: raw.run_id,
            graph_version: raw.graph_version,
        }
    }
}

impl fmt::Display for DagRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id: {}, dag_name: {}, database_name: {}, schema_name: {}, state: {}",
            self.run_id, self.dag_name, self.database_name, self.schema_name, self.state
        )?;
        if let Some(task) = &self.first_error_task_name {
            write!(f, ", first_error_task_name: {task}")?;
        }
        if let Some(code) = self.first_error_code {
            write!(f, ", first_error_code: {code}")?;
        }
        if let Some(message) = &self.first_error_message {
            write!(f, ", first_error_message: {message}")?;
        }
        if let Some(t) = self.scheduled_time {
            write!(f, ", scheduled_time: {}", t.to_rfc3339())?;
        }
        if let Some(t) = self.query_start_time {
            write!(f, ", query_start_time: {}", t.to_rfc3339())?;
        }
        if let Some(t) = self.next_scheduled_time {
            write!(f, ", next_scheduled_time: {}", t.to_rfc3339())?;
        }
        write!(f, ", graph_version: {}", self.graph_version)
    }
}

impl<B: TaskBackend> DagOperation<B> {
    /// Recently completed runs of the graph; only failed ones when
    /// `error_only` is set.
    pub fn get_complete_dag_runs<'a>(
        &self,
        target: impl Into<DagTarget<'a>>,
        error_only: bool,
    ) -> Result<Vec<DagRun>> {
        let target = target.into();
        let runs = self.backend.list_completed_runs(target.name(), error_only)?;
        Ok(runs.into_iter().map(DagRun::from).collect())
    }

    /// Runs in progress, plus the runs scheduled for the next 8 days.
    pub fn get_current_dag_runs<'a>(&self, target: impl Into<DagTarget<'a>>) -> Result<Vec<DagRun>> {
        let target = target.into();
        let runs = self.backend.list_current_runs(target.name())?;
        Ok(runs.into_iter().map(DagRun::from).collect())
    }
}
