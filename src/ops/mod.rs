// src/ops/mod.rs

//! Deployment and lifecycle of task graphs on a [`TaskBackend`].
//!
//! [`DagOperation`] holds no state besides its backend. Every operation is a
//! strictly sequential series of backend calls; nothing is retried and a
//! failed deploy is not rolled back. Re-running `deploy` with
//! [`CreateMode::OrReplace`] or calling `drop` recovers.

use tracing::{debug, info};

use crate::backend::{BackendResult, TaskBackend, TaskDefinition};
use crate::dag::{Graph, lower, topological_order};
use crate::errors::Result;
use crate::ident;
use crate::types::CreateMode;

pub mod runs;

pub use runs::DagRun;

/// A graph to operate on: either the local model or just its name.
#[derive(Debug, Clone, Copy)]
pub enum DagTarget<'a> {
    Graph(&'a Graph),
    Name(&'a str),
}

impl DagTarget<'_> {
    /// Name of the graph's root task.
    pub fn name(&self) -> &str {
        match self {
            DagTarget::Graph(g) => g.name(),
            DagTarget::Name(n) => n,
        }
    }
}

impl<'a> From<&'a Graph> for DagTarget<'a> {
    fn from(graph: &'a Graph) -> Self {
        DagTarget::Graph(graph)
    }
}

impl<'a> From<&'a str> for DagTarget<'a> {
    fn from(name: &'a str) -> Self {
        DagTarget::Name(name)
    }
}

impl<'a> From<&'a String> for DagTarget<'a> {
    fn from(name: &'a String) -> Self {
        DagTarget::Name(name.as_str())
    }
}

/// What `drop` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Dropped,
    /// The root task did not exist; nothing was changed.
    AlreadyAbsent,
}

/// Backend definitions of a graph, in the order `deploy` creates them.
#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub root: TaskDefinition,
    pub tasks: Vec<TaskDefinition>,
}

/// Linearize and lower `graph` without touching any backend.
///
/// Every structural error (cycle, missing stage location, ...) surfaces here.
pub fn plan(graph: &Graph) -> Result<DeployPlan> {
    let order = topological_order(graph)?;
    let tasks = order
        .into_iter()
        .map(|id| graph.get(id).and_then(|task| lower::task_definition(graph, task)))
        .collect::<Result<Vec<_>>>()?;

    Ok(DeployPlan {
        root: lower::root_definition(graph),
        tasks,
    })
}

/// Orchestrator bound to one backend namespace.
#[derive(Debug, Clone)]
pub struct DagOperation<B: TaskBackend> {
    backend: B,
}

impl<B: TaskBackend> DagOperation<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Create the root and every task of `graph`, then resume them.
    ///
    /// The graph is planned first, so a structural error means no backend
    /// call at all. With [`CreateMode::OrReplace`] any previous deployment
    /// (finalizer included) is dropped before creating.
    pub fn deploy(&self, graph: &Graph, mode: CreateMode) -> Result<()> {
        let plan = plan(graph)?;
        info!(dag = %graph.name(), %mode, tasks = plan.tasks.len(), "deploying task graph");

        if mode == CreateMode::OrReplace {
            self.drop(graph, true)?;
        }

        self.backend.create(&plan.root, mode)?;
        debug!(dag = %graph.name(), "created root task");

        for task in &plan.tasks {
            self.backend.create(task, mode)?;
            self.backend.resume(&task.name)?;
            debug!(task = %task.name, "created and resumed task");
        }

        if graph.schedule().is_some() {
            self.backend.resume(&plan.root.name)?;
            debug!(dag = %graph.name(), "resumed root task");
        }

        info!(dag = %graph.name(), "task graph deployed");
        Ok(())
    }

    /// Remove a deployed graph, children before parents and the root last.
    ///
    /// The finalizer is kept unless `drop_finalizer` is set. Tasks that are
    /// already gone are skipped, so dropping twice is fine.
    pub fn drop<'a>(&self, target: impl Into<DagTarget<'a>>, drop_finalizer: bool) -> Result<DropOutcome> {
        let target = target.into();
        let name = target.name();

        let root = match self.backend.fetch(name) {
            Ok(root) => root,
            Err(e) if e.is_not_found() => {
                info!(dag = %name, "task graph already dropped");
                return Ok(DropOutcome::AlreadyAbsent);
            }
            Err(e) => return Err(e.into()),
        };

        if root.is_started() {
            self.backend.suspend(name)?;
        }

        let dependents = self.backend.fetch_dependents(name)?;
        let finalizer = root.finalizer_task().map(ident::short_name);

        for task in dependents.iter().rev() {
            if task.name == name {
                continue;
            }
            if !drop_finalizer && finalizer.as_deref() == Some(task.name.as_str()) {
                debug!(task = %task.name, "keeping finalizer task");
                continue;
            }
            self.suspend_and_drop(&task.name)?;
        }
        self.suspend_and_drop(name)?;

        info!(dag = %name, "task graph dropped");
        Ok(DropOutcome::Dropped)
    }

    /// Trigger an immediate run. A scheduled graph's root is resumed first.
    pub fn run<'a>(&self, target: impl Into<DagTarget<'a>>, retry_last: bool) -> Result<()> {
        let target = target.into();
        let name = target.name();

        let scheduled = match target {
            DagTarget::Graph(graph) => graph.schedule().is_some(),
            DagTarget::Name(name) => self.backend.fetch(name)?.schedule.is_some(),
        };
        if scheduled {
            self.backend.resume(name)?;
        }

        self.backend.execute(name, retry_last)?;
        info!(dag = %name, retry_last, "task graph run requested");
        Ok(())
    }

    /// Names of deployed graphs matching a case-insensitive SQL `LIKE`
    /// pattern.
    pub fn iter_dags(&self, like: &str) -> Result<Vec<String>> {
        Ok(self.backend.list_roots(like)?)
    }

    fn suspend_and_drop(&self, name: &str) -> Result<()> {
        tolerate_not_found(name, self.backend.suspend(name))?;
        tolerate_not_found(name, self.backend.drop_task(name))?;
        debug!(task = %name, "dropped task");
        Ok(())
    }
}

fn tolerate_not_found(name: &str, result: BackendResult<()>) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => {
            debug!(task = %name, "task already gone");
            Ok(())
        }
        other => Ok(other?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, InMemoryBackend};
    use crate::dag::Definition;

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new("DB", "SCH")
    }

    #[test]
    fn plan_lists_root_and_tasks_in_creation_order() {
        let mut g = Graph::new("G");
        let b = g.add_task("B", Definition::sql("select 2")).unwrap();
        let a = g.add_task("A", Definition::sql("select 1")).unwrap();
        g.add_predecessors(b, a).unwrap();

        let plan = plan(&g).unwrap();
        assert_eq!(plan.root.name, "G");
        let names: Vec<&str> = plan.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["G$A", "G$B"]);
    }

    #[test]
    fn unscheduled_deploy_leaves_root_suspended() {
        let backend = backend();
        let ops = DagOperation::new(backend.clone());
        let mut g = Graph::new("G");
        g.add_task("A", Definition::sql("select 1")).unwrap();

        ops.deploy(&g, CreateMode::ErrorIfExists).unwrap();

        assert!(!backend.calls().contains(&BackendCall::Resume("G".into())));
        assert_eq!(backend.state_of("G"), Some(crate::types::TaskState::Suspended));
    }

    #[test]
    fn drop_of_missing_graph_is_a_no_op() {
        let backend = backend();
        let ops = DagOperation::new(backend.clone());
        assert_eq!(ops.drop("NOPE", false).unwrap(), DropOutcome::AlreadyAbsent);
        assert_eq!(backend.calls(), vec![BackendCall::Fetch("NOPE".into())]);
    }
}
