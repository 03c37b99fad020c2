// src/config/convert.rs

use std::collections::BTreeMap;

use crate::config::model::{ConfigFile, TaskConfig};
use crate::dag::schedule::{Schedule, parse_duration};
use crate::dag::{Graph, GraphSettings, TaskId, TaskOptions};
use crate::errors::{Result, TaskdagError};

impl ConfigFile {
    /// The `[dag]` schedule, if any.
    pub fn schedule(&self) -> Result<Option<Schedule>> {
        if let Some(cron) = &self.dag.cron {
            return Ok(Some(Schedule::cron(cron.expr.clone(), cron.timezone.clone())));
        }
        match &self.dag.schedule {
            Some(every) => {
                let every = parse_duration(every).map_err(TaskdagError::ConfigError)?;
                Ok(Some(Schedule::interval(every)?))
            }
            None => Ok(None),
        }
    }

    pub fn graph_settings(&self) -> Result<GraphSettings> {
        let dag = &self.dag;
        Ok(GraphSettings {
            schedule: self.schedule()?,
            warehouse: dag.warehouse.clone(),
            comment: dag.comment.clone(),
            error_integration: dag.error_integration.clone(),
            allow_overlapping_execution: dag.allow_overlapping_execution,
            user_task_timeout_ms: dag.user_task_timeout_ms,
            suspend_task_after_num_failures: dag.suspend_task_after_num_failures,
            task_auto_retry_attempts: dag.task_auto_retry_attempts,
            config: dag.config.clone(),
            session_parameters: dag.session_parameters.clone(),
            stage_location: dag.stage_location.clone(),
            imports: dag.imports.clone(),
            packages: dag.packages.clone(),
            use_func_return_value: dag.use_func_return_value,
        })
    }

    /// Build the graph described by this file.
    ///
    /// Tasks are added in name order, then each task's `after` list is wired
    /// in the order written, so the resulting graph is the same on every
    /// load.
    pub fn to_graph(&self) -> Result<Graph> {
        let mut graph = Graph::with_settings(self.dag.name.clone(), self.graph_settings()?);
        let mut ids: BTreeMap<&str, TaskId> = BTreeMap::new();

        for (name, task) in &self.task {
            let id = add_task(&mut graph, name, task)?;
            ids.insert(name.as_str(), id);
        }

        for (name, task) in &self.task {
            let id = ids[name.as_str()];
            for dep in &task.after {
                let dep_id = ids.get(dep.as_str()).copied().ok_or_else(|| {
                    TaskdagError::TaskNotFound(format!("'{}' (in `after` of task '{}')", dep, name))
                })?;
                graph.add_predecessors(id, dep_id)?;
            }
        }

        Ok(graph)
    }
}

fn add_task(graph: &mut Graph, name: &str, task: &TaskConfig) -> Result<TaskId> {
    let definition = task.definition().ok_or_else(|| {
        TaskdagError::ConfigError(format!(
            "task '{}' must set exactly one of `sql`, `function` or `procedure`",
            name
        ))
    })?;

    let target_completion_interval = task
        .target_completion_interval
        .as_deref()
        .map(parse_duration)
        .transpose()
        .map_err(TaskdagError::ConfigError)?;

    let options = TaskOptions {
        comment: task.comment.clone(),
        session_parameters: task.session_parameters.clone(),
        user_task_managed_initial_warehouse_size: task
            .user_task_managed_initial_warehouse_size
            .clone(),
        target_completion_interval,
        serverless_task_min_statement_size: task.serverless_task_min_statement_size.clone(),
        serverless_task_max_statement_size: task.serverless_task_max_statement_size.clone(),
        user_task_timeout_ms: task.user_task_timeout_ms,
    };

    let mut builder = graph
        .task(name, definition)
        .serverless(task.serverless)
        .finalizer(task.finalizer)
        .options(options);
    if task.branch {
        builder = builder.branch();
    }
    if let Some(condition) = &task.condition {
        builder = builder.condition(condition.clone());
    }
    if let Some(warehouse) = &task.warehouse {
        builder = builder.warehouse(warehouse.clone());
    }
    builder.add()
}
