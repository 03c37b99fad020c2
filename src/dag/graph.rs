// src/dag/graph.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tracing::debug;

use crate::dag::definition::Definition;
use crate::dag::schedule::{Schedule, target_completion_minutes};
use crate::dag::task::{self, DagTask, TaskKind, TaskOptions};
use crate::errors::{Result, TaskdagError};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(u64);

/// Handle to a task inside a specific graph.
///
/// Handles carry their graph's identity, so a handle from one graph is
/// rejected by every other graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    graph: GraphId,
    index: usize,
}

impl TaskId {
    pub fn graph(&self) -> GraphId {
        self.graph
    }

    /// Position of the task in its graph's insertion order.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.graph.0, self.index)
    }
}

/// Settings shared by every task of a graph.
///
/// They end up on the implicit root task, and `warehouse`, `stage_location`,
/// `imports`, `packages`, `use_func_return_value` also act as defaults for
/// the graph's tasks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSettings {
    pub schedule: Option<Schedule>,
    pub warehouse: Option<String>,
    pub comment: Option<String>,
    pub error_integration: Option<String>,
    pub allow_overlapping_execution: Option<bool>,
    pub user_task_timeout_ms: Option<u64>,
    pub suspend_task_after_num_failures: Option<u32>,
    pub task_auto_retry_attempts: Option<u32>,
    pub config: BTreeMap<String, toml::Value>,
    pub session_parameters: BTreeMap<String, toml::Value>,
    pub stage_location: Option<String>,
    pub imports: Vec<String>,
    pub packages: Vec<String>,
    pub use_func_return_value: bool,
}

/// A named, ordered collection of tasks that is deployed as one unit.
#[derive(Debug, Clone)]
pub struct Graph {
    id: GraphId,
    name: String,
    settings: GraphSettings,
    pub(crate) tasks: IndexMap<String, DagTask>,
    finalizer: Option<usize>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, GraphSettings::default())
    }

    pub fn with_settings(name: impl Into<String>, settings: GraphSettings) -> Self {
        Self {
            id: GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            settings,
            tasks: IndexMap::new(),
            finalizer: None,
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Graph name, which is also the name of the implicit root task.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.settings.schedule.as_ref()
    }

    /// Start building a task owned by this graph.
    pub fn task(&mut self, name: impl Into<String>, definition: impl Into<Definition>) -> TaskBuilder<'_> {
        TaskBuilder::new(self, name.into(), definition.into())
    }

    /// Add a plain task with default settings.
    pub fn add_task(&mut self, name: impl Into<String>, definition: impl Into<Definition>) -> Result<TaskId> {
        self.task(name, definition).add()
    }

    /// Look up a task by handle.
    pub fn get(&self, id: TaskId) -> Result<&DagTask> {
        self.check_owned(id)?;
        self.tasks
            .get_index(id.index)
            .map(|(_, t)| t)
            .ok_or_else(|| TaskdagError::TaskNotFound(id.to_string()))
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Result<&mut DagTask> {
        self.check_owned(id)?;
        self.tasks
            .get_index_mut(id.index)
            .map(|(_, t)| t)
            .ok_or_else(|| TaskdagError::TaskNotFound(id.to_string()))
    }

    pub fn get_task(&self, name: &str) -> Option<&DagTask> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn finalizer(&self) -> Option<&DagTask> {
        self.finalizer
            .and_then(|i| self.tasks.get_index(i))
            .map(|(_, t)| t)
    }

    /// Tasks in insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = &DagTask> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn check_owned(&self, id: TaskId) -> Result<()> {
        if id.graph != self.id {
            return Err(TaskdagError::InvalidOperation(format!(
                "task {} does not belong to graph '{}'",
                id, self.name
            )));
        }
        Ok(())
    }

    fn insert(&mut self, task: DagTask) -> TaskId {
        let id = task.id;
        if task.finalizer {
            self.finalizer = Some(id.index);
        }
        debug!(dag = %self.name, task = %task.name, "registered task");
        self.tasks.insert(task.name.clone(), task);
        id
    }
}

/// Builder returned by [`Graph::task`]. Nothing is registered until
/// [`TaskBuilder::add`] succeeds.
#[must_use = "a task is only added to the graph by calling `add`"]
pub struct TaskBuilder<'g> {
    graph: &'g mut Graph,
    name: String,
    definition: Definition,
    condition: Option<String>,
    warehouse: Option<String>,
    serverless: bool,
    finalizer: bool,
    kind: TaskKind,
    options: TaskOptions,
}

impl<'g> TaskBuilder<'g> {
    fn new(graph: &'g mut Graph, name: String, definition: Definition) -> Self {
        Self {
            graph,
            name,
            definition,
            condition: None,
            warehouse: None,
            serverless: false,
            finalizer: false,
            kind: TaskKind::Plain,
            options: TaskOptions::default(),
        }
    }

    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    pub fn serverless(mut self, serverless: bool) -> Self {
        self.serverless = serverless;
        self
    }

    pub fn finalizer(mut self, finalizer: bool) -> Self {
        self.finalizer = finalizer;
        self
    }

    /// Mark the task as a branch: its return value picks the successor.
    pub fn branch(mut self) -> Self {
        self.kind = TaskKind::Branch;
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.options.comment = Some(comment.into());
        self
    }

    pub fn options(mut self, options: TaskOptions) -> Self {
        self.options = options;
        self
    }

    pub fn add(self) -> Result<TaskId> {
        let graph = self.graph;
        let name = self.name;

        if name.trim().is_empty() {
            return Err(TaskdagError::InvalidTask(format!(
                "tasks of graph '{}' must have a non-empty name",
                graph.name
            )));
        }
        if self.serverless && self.warehouse.is_some() {
            return Err(TaskdagError::InvalidTask(format!(
                "task '{name}' is serverless and cannot also set a warehouse"
            )));
        }
        if graph.tasks.contains_key(&name) {
            return Err(TaskdagError::DuplicateTask(format!(
                "graph '{}' already has a task named '{}'",
                graph.name, name
            )));
        }
        if self.finalizer {
            if let Some(existing) = graph.finalizer() {
                return Err(TaskdagError::InvalidOperation(format!(
                    "graph '{}' already has finalizer task '{}'",
                    graph.name,
                    existing.name()
                )));
            }
        }
        if let Some(interval) = self.options.target_completion_interval {
            target_completion_minutes(interval)?;
        }

        let warehouse = match self.warehouse {
            Some(w) => Some(w),
            None if !self.serverless => graph.settings.warehouse.clone(),
            None => None,
        };

        let task = DagTask {
            id: TaskId {
                graph: graph.id,
                index: graph.tasks.len(),
            },
            full_name: task::full_name(&graph.name, &name),
            name,
            definition: self.definition,
            condition: self.condition,
            warehouse,
            serverless: self.serverless,
            finalizer: self.finalizer,
            kind: self.kind,
            predecessors: Vec::new(),
            options: self.options,
        };
        Ok(graph.insert(task))
    }
}

/// Target completion interval in minutes, for lowering.
pub(crate) fn completion_minutes(options: &TaskOptions) -> Result<Option<u32>> {
    options
        .target_completion_interval
        .map(target_completion_minutes)
        .transpose()
}
