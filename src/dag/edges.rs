// src/dag/edges.rs

//! Dependency wiring between tasks of one graph.
//!
//! Every edge is stored on the dependent as a predecessor; adding a
//! successor is the same edge seen from the other end. When a branch task
//! becomes a predecessor, the dependent's condition is extended with a check
//! on the branch's return value.

use tracing::debug;

use crate::dag::definition::ProcedureCall;
use crate::dag::graph::{Graph, TaskId};
use crate::errors::{Result, TaskdagError};
use crate::ident::normalize_name;

/// Backend function that yields a predecessor's return value.
const PREDECESSOR_RETURN_VALUE_FN: &str = "SYSTEM$GET_PREDECESSOR_RETURN_VALUE";

/// The other end of an edge.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskArg {
    Task(TaskId),
    Tasks(Vec<TaskId>),
    /// A bare call, wrapped into a new task named after the call.
    Call(ProcedureCall),
}

impl From<TaskId> for TaskArg {
    fn from(id: TaskId) -> Self {
        TaskArg::Task(id)
    }
}

impl From<Vec<TaskId>> for TaskArg {
    fn from(ids: Vec<TaskId>) -> Self {
        TaskArg::Tasks(ids)
    }
}

impl From<&[TaskId]> for TaskArg {
    fn from(ids: &[TaskId]) -> Self {
        TaskArg::Tasks(ids.to_vec())
    }
}

impl<const N: usize> From<[TaskId; N]> for TaskArg {
    fn from(ids: [TaskId; N]) -> Self {
        TaskArg::Tasks(ids.to_vec())
    }
}

impl From<ProcedureCall> for TaskArg {
    fn from(call: ProcedureCall) -> Self {
        TaskArg::Call(call)
    }
}

/// Condition that holds when the branch task `branch_full_name` returned
/// exactly `successor_name`.
pub fn branch_check(branch_full_name: &str, successor_name: &str) -> Result<String> {
    Ok(format!(
        "{}('{}') = '{}'",
        PREDECESSOR_RETURN_VALUE_FN,
        normalize_name(branch_full_name)?,
        successor_name.replace('\'', "''")
    ))
}

impl Graph {
    /// Make every task in `other` a predecessor of `task`.
    pub fn add_predecessors(&mut self, task: TaskId, other: impl Into<TaskArg>) -> Result<()> {
        self.follows(task, other).map(|_| ())
    }

    /// Make `task` a predecessor of every task in `other`.
    pub fn add_successors(&mut self, task: TaskId, other: impl Into<TaskArg>) -> Result<()> {
        self.precedes(task, other).map(|_| ())
    }

    /// `task` runs before `other`. Returns the resolved `other` for chaining.
    pub fn precedes(&mut self, task: TaskId, other: impl Into<TaskArg>) -> Result<Vec<TaskId>> {
        let source = self.get(task)?;
        if source.is_finalizer() {
            return Err(TaskdagError::InvalidOperation(format!(
                "task '{}' is a finalizer and cannot have any successors",
                source.name()
            )));
        }

        let other = other.into();
        if let TaskArg::Call(call) = &other {
            self.joined_condition(task, call.name(), None)?;
        }
        let successors = self.resolve(other)?;
        let edges: Vec<_> = successors.iter().map(|&s| (task, s)).collect();
        self.connect_all(&edges)?;
        Ok(successors)
    }

    /// `task` runs after `other`. Returns the resolved `other` for chaining.
    pub fn follows(&mut self, task: TaskId, other: impl Into<TaskArg>) -> Result<Vec<TaskId>> {
        let target = self.get(task)?;
        if target.is_finalizer() {
            return Err(TaskdagError::InvalidOperation(format!(
                "task '{}' is a finalizer and cannot have any predecessors",
                target.name()
            )));
        }

        let predecessors = self.resolve(other.into())?;
        let edges: Vec<_> = predecessors.iter().map(|&p| (p, task)).collect();
        self.connect_all(&edges)?;
        Ok(predecessors)
    }

    /// Turn an edge argument into task handles of this graph.
    ///
    /// All handles are checked before anything is changed; a call is only
    /// wrapped into a new task once the rest of the argument is valid.
    fn resolve(&mut self, arg: TaskArg) -> Result<Vec<TaskId>> {
        let ids = match arg {
            TaskArg::Task(id) => vec![id],
            TaskArg::Tasks(ids) => ids,
            TaskArg::Call(call) => {
                let name = call.name().to_string();
                return Ok(vec![self.add_task(name, call)?]);
            }
        };

        for &id in &ids {
            let task = self.get(id)?;
            if task.is_finalizer() {
                return Err(TaskdagError::InvalidOperation(format!(
                    "task '{}' is a finalizer and cannot be a predecessor or successor of any task",
                    task.name()
                )));
            }
        }
        Ok(ids)
    }

    /// Condition a task named `dependent_name` ends up with once `predecessor`
    /// is added, or `None` when the predecessor is not a branch.
    fn joined_condition(
        &self,
        predecessor: TaskId,
        dependent_name: &str,
        existing: Option<&str>,
    ) -> Result<Option<String>> {
        let pred = self.get(predecessor)?;
        if !pred.is_branch() {
            return Ok(None);
        }
        let check = branch_check(pred.full_name(), dependent_name)?;
        Ok(Some(match existing {
            Some(existing) => format!("{check} and {existing}"),
            None => check,
        }))
    }

    /// Add every `(predecessor, dependent)` edge, or none of them.
    fn connect_all(&mut self, edges: &[(TaskId, TaskId)]) -> Result<()> {
        for &(predecessor, dependent) in edges {
            let task = self.get(dependent)?;
            self.joined_condition(predecessor, &task.name, None)?;
        }
        for &(predecessor, dependent) in edges {
            self.connect(predecessor, dependent)?;
        }
        Ok(())
    }

    fn connect(&mut self, predecessor: TaskId, dependent: TaskId) -> Result<()> {
        let pred_name = self.get(predecessor)?.name().to_string();
        let task = self.get(dependent)?;
        if task.predecessors.contains(&predecessor) {
            return Ok(());
        }
        let condition = self.joined_condition(predecessor, &task.name, task.condition.as_deref())?;

        let task = self.get_mut(dependent)?;
        task.predecessors.push(predecessor);
        match condition {
            Some(condition) => {
                task.condition = Some(condition);
                debug!(branch = %pred_name, task = %task.name, "injected branch condition");
            }
            None => debug!(predecessor = %pred_name, task = %task.name, "added predecessor"),
        }
        Ok(())
    }
}
