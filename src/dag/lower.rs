// src/dag/lower.rs

//! Lowering of a [`Graph`] into backend task definitions.

use crate::backend::TaskDefinition;
use crate::dag::definition::Definition;
use crate::dag::graph::{Graph, completion_minutes};
use crate::dag::task::DagTask;
use crate::errors::{Result, TaskdagError};

/// Body of the placeholder root task that anchors every graph.
pub const ROOT_BODY: &str = "select 'dag dummy root'";

/// The implicit root task: carries the schedule and graph-wide settings.
pub fn root_definition(graph: &Graph) -> TaskDefinition {
    let s = graph.settings();
    let mut root = TaskDefinition::new(graph.name(), Definition::sql(ROOT_BODY));
    root.warehouse = s.warehouse.clone();
    root.schedule = s.schedule.clone();
    root.comment = s.comment.clone();
    root.error_integration = s.error_integration.clone();
    root.allow_overlapping_execution = s.allow_overlapping_execution;
    root.user_task_timeout_ms = s.user_task_timeout_ms;
    root.suspend_task_after_num_failures = s.suspend_task_after_num_failures;
    root.task_auto_retry_attempts = s.task_auto_retry_attempts;
    root.config = s.config.clone();
    root.session_parameters = s.session_parameters.clone();
    root
}

/// Backend definition of one task, with graph defaults applied.
///
/// A task without predecessors hangs off the root; the finalizer has no
/// predecessors and points at the root through `finalize` instead.
pub fn task_definition(graph: &Graph, task: &DagTask) -> Result<TaskDefinition> {
    let s = graph.settings();

    let definition = match task.definition() {
        Definition::Sql(text) => Definition::Sql(text.clone()),
        Definition::Call(call) => {
            let mut call = call.clone();
            if call.stage_location.is_none() {
                call.stage_location = s.stage_location.clone();
            }
            if call.imports.is_empty() {
                call.imports = s.imports.clone();
            }
            if call.packages.is_empty() {
                call.packages = s.packages.clone();
            }
            call.use_return_value = s.use_func_return_value;

            if call.needs_stage() && call.stage_location.is_none() {
                return Err(TaskdagError::InvalidTask(format!(
                    "task '{}' calls function '{}' but neither the task nor graph '{}' sets a stage location",
                    task.name(),
                    call.name(),
                    graph.name()
                )));
            }
            Definition::Call(call)
        }
    };

    let mut def = TaskDefinition::new(task.full_name(), definition);
    def.warehouse = task.warehouse().map(str::to_string);
    def.condition = task.condition().map(str::to_string);

    if task.is_finalizer() {
        def.finalize = Some(graph.name().to_string());
    } else if task.predecessors().is_empty() {
        def.predecessors = vec![graph.name().to_string()];
    } else {
        def.predecessors = task
            .predecessors()
            .iter()
            .map(|id| graph.get(*id).map(|p| p.full_name().to_string()))
            .collect::<Result<Vec<_>>>()?;
    }

    let o = task.options();
    def.comment = o.comment.clone();
    def.session_parameters = o.session_parameters.clone();
    def.user_task_managed_initial_warehouse_size = o.user_task_managed_initial_warehouse_size.clone();
    def.target_completion_interval_minutes = completion_minutes(o)?;
    def.serverless_task_min_statement_size = o.serverless_task_min_statement_size.clone();
    def.serverless_task_max_statement_size = o.serverless_task_max_statement_size.clone();
    def.user_task_timeout_ms = o.user_task_timeout_ms;

    Ok(def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::definition::ProcedureCall;
    use crate::dag::graph::GraphSettings;
    use crate::dag::schedule::Schedule;

    fn settings() -> GraphSettings {
        GraphSettings {
            schedule: Some(Schedule::Interval { minutes: 60 }),
            warehouse: Some("ETL_WH".into()),
            stage_location: Some("@CODE".into()),
            packages: vec!["pandas".into()],
            use_func_return_value: true,
            ..GraphSettings::default()
        }
    }

    #[test]
    fn root_carries_schedule_and_placeholder_body() {
        let g = Graph::with_settings("NIGHTLY", settings());
        let root = root_definition(&g);
        assert_eq!(root.name, "NIGHTLY");
        assert_eq!(root.definition, Definition::sql(ROOT_BODY));
        assert_eq!(root.schedule, Some(Schedule::Interval { minutes: 60 }));
        assert!(root.predecessors.is_empty());
    }

    #[test]
    fn tasks_are_anchored_to_root_or_their_predecessors() {
        let mut g = Graph::with_settings("NIGHTLY", settings());
        let a = g.add_task("A", Definition::sql("select 1")).unwrap();
        let b = g.add_task("B", Definition::sql("select 2")).unwrap();
        g.add_predecessors(b, a).unwrap();

        let a_def = task_definition(&g, g.get(a).unwrap()).unwrap();
        let b_def = task_definition(&g, g.get(b).unwrap()).unwrap();
        assert_eq!(a_def.name, "NIGHTLY$A");
        assert_eq!(a_def.predecessors, vec!["NIGHTLY"]);
        assert_eq!(b_def.predecessors, vec!["NIGHTLY$A"]);
        assert_eq!(b_def.warehouse.as_deref(), Some("ETL_WH"));
        assert!(a_def.schedule.is_none());
    }

    #[test]
    fn finalizer_points_at_root() {
        let mut g = Graph::with_settings("NIGHTLY", settings());
        let f = g
            .task("CLEANUP", Definition::sql("select 1"))
            .finalizer(true)
            .add()
            .unwrap();
        let def = task_definition(&g, g.get(f).unwrap()).unwrap();
        assert!(def.predecessors.is_empty());
        assert_eq!(def.finalize.as_deref(), Some("NIGHTLY"));
    }

    #[test]
    fn calls_inherit_graph_packaging() {
        let mut g = Graph::with_settings("NIGHTLY", settings());
        let t = g
            .add_task("ROUTE", ProcedureCall::function("route_handler"))
            .unwrap();
        let def = task_definition(&g, g.get(t).unwrap()).unwrap();
        match def.definition {
            Definition::Call(call) => {
                assert_eq!(call.stage_location.as_deref(), Some("@CODE"));
                assert_eq!(call.packages, vec!["pandas"]);
                assert!(call.use_return_value);
            }
            other => panic!("expected a call, got {other:?}"),
        }
    }

    #[test]
    fn function_without_stage_is_rejected() {
        let mut g = Graph::new("NIGHTLY");
        let t = g
            .add_task("ROUTE", ProcedureCall::function("route_handler"))
            .unwrap();
        let err = task_definition(&g, g.get(t).unwrap()).unwrap_err();
        assert!(matches!(err, TaskdagError::InvalidTask(_)));
    }
}
