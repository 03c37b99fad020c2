// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::schedule::{Schedule, parse_duration, target_completion_minutes};
use crate::errors::{Result, TaskdagError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::TaskdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.target, raw.dag, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_target(cfg)?;
    validate_dag_section(cfg)?;
    validate_task_bodies(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_finalizer(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskdagError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_target(cfg: &RawConfigFile) -> Result<()> {
    if cfg.target.database.trim().is_empty() || cfg.target.schema.trim().is_empty() {
        return Err(TaskdagError::ConfigError(
            "[target].database and [target].schema must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_dag_section(cfg: &RawConfigFile) -> Result<()> {
    let dag = &cfg.dag;
    if dag.name.trim().is_empty() {
        return Err(TaskdagError::ConfigError(
            "[dag].name must not be empty".to_string(),
        ));
    }

    match (&dag.schedule, &dag.cron) {
        (Some(_), Some(_)) => {
            return Err(TaskdagError::ConfigError(
                "[dag] may set either `schedule` or `cron`, not both".to_string(),
            ));
        }
        (Some(every), None) => {
            let every = parse_duration(every).map_err(|e| {
                TaskdagError::ConfigError(format!("[dag].schedule is invalid: {e}"))
            })?;
            Schedule::interval(every)
                .map_err(|e| TaskdagError::ConfigError(format!("[dag].schedule: {e}")))?;
        }
        (None, Some(cron)) => {
            if cron.expr.trim().is_empty() {
                return Err(TaskdagError::ConfigError(
                    "[dag].cron.expr must not be empty".to_string(),
                ));
            }
        }
        (None, None) => {}
    }
    Ok(())
}

fn validate_task_bodies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.body_count() != 1 {
            return Err(TaskdagError::ConfigError(format!(
                "task '{}' must set exactly one of `sql`, `function` or `procedure`",
                name
            )));
        }
        if task.serverless && task.warehouse.is_some() {
            return Err(TaskdagError::ConfigError(format!(
                "task '{}' is serverless and cannot also set `warehouse`",
                name
            )));
        }
        if task.function.is_some()
            && task.stage_location.is_none()
            && cfg.dag.stage_location.is_none()
        {
            return Err(TaskdagError::ConfigError(format!(
                "task '{}' calls a function but no `stage_location` is set on the task or in [dag]",
                name
            )));
        }
        if let Some(interval) = &task.target_completion_interval {
            let interval = parse_duration(interval).map_err(|e| {
                TaskdagError::ConfigError(format!(
                    "task '{}' has invalid `target_completion_interval`: {}",
                    name, e
                ))
            })?;
            target_completion_minutes(interval)
                .map_err(|e| TaskdagError::ConfigError(format!("task '{}': {}", name, e)))?;
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(TaskdagError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(TaskdagError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_finalizer(cfg: &RawConfigFile) -> Result<()> {
    let finalizers: Vec<&String> = cfg
        .task
        .iter()
        .filter(|(_, t)| t.finalizer)
        .map(|(name, _)| name)
        .collect();

    if finalizers.len() > 1 {
        return Err(TaskdagError::ConfigError(format!(
            "at most one task may be a finalizer, found {:?}",
            finalizers
        )));
    }

    if let Some(finalizer) = finalizers.first() {
        if !cfg.task[*finalizer].after.is_empty() {
            return Err(TaskdagError::ConfigError(format!(
                "finalizer task '{}' cannot have `after` dependencies",
                finalizer
            )));
        }
        if let Some((name, _)) = cfg.task.iter().find(|(_, t)| t.after.contains(*finalizer)) {
            return Err(TaskdagError::ConfigError(format!(
                "task '{}' cannot run after finalizer task '{}'",
                name, finalizer
            )));
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> task
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(TaskdagError::DagCycle(format!(
                "cycle detected in task DAG involving task '{}'",
                node
            )))
        }
    }
}
