// src/dag/task.rs

use std::collections::BTreeMap;
use std::time::Duration;

use crate::dag::definition::Definition;
use crate::dag::graph::TaskId;

/// Separator between the graph name and a task name in the backend-visible
/// full name.
pub const FULL_NAME_SEPARATOR: char = '$';

/// Whether a task takes part in branch-condition injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskKind {
    #[default]
    Plain,
    /// The task's return value names the successor that should run next.
    Branch,
}

/// Per-task settings that are passed through to the backend unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOptions {
    pub comment: Option<String>,
    pub session_parameters: BTreeMap<String, toml::Value>,
    pub user_task_managed_initial_warehouse_size: Option<String>,
    /// Serverless only. Whole minutes, at most one day.
    pub target_completion_interval: Option<Duration>,
    pub serverless_task_min_statement_size: Option<String>,
    pub serverless_task_max_statement_size: Option<String>,
    pub user_task_timeout_ms: Option<u64>,
}

/// One node of a [`Graph`](crate::dag::Graph).
///
/// Tasks are created through [`Graph::task`](crate::dag::Graph::task) and
/// wired through the graph's edge methods; the graph is the only owner.
#[derive(Debug, Clone)]
pub struct DagTask {
    pub(crate) id: TaskId,
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) definition: Definition,
    pub(crate) condition: Option<String>,
    pub(crate) warehouse: Option<String>,
    pub(crate) serverless: bool,
    pub(crate) finalizer: bool,
    pub(crate) kind: TaskKind,
    pub(crate) predecessors: Vec<TaskId>,
    pub(crate) options: TaskOptions,
}

impl DagTask {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<graph name>$<task name>`, the name the backend knows the task by.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// Effective warehouse: the explicit one, or the graph default unless
    /// the task is serverless.
    pub fn warehouse(&self) -> Option<&str> {
        self.warehouse.as_deref()
    }

    pub fn is_serverless(&self) -> bool {
        self.serverless
    }

    pub fn is_finalizer(&self) -> bool {
        self.finalizer
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn is_branch(&self) -> bool {
        self.kind == TaskKind::Branch
    }

    /// Direct predecessors in the order they were added.
    pub fn predecessors(&self) -> &[TaskId] {
        &self.predecessors
    }

    pub fn options(&self) -> &TaskOptions {
        &self.options
    }
}

pub(crate) fn full_name(graph_name: &str, task_name: &str) -> String {
    format!("{graph_name}{FULL_NAME_SEPARATOR}{task_name}")
}
