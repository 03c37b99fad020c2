// src/lib.rs

pub mod backend;
pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod ident;
pub mod logging;
pub mod ops;
pub mod types;

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::backend::{StateFileBackend, TaskBackend};
use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::dag::Graph;
use crate::ops::{DagOperation, DeployPlan, DropOutcome};

/// High-level entry point used by `main.rs`.
///
/// Loads the project file, builds the graph and dispatches the subcommand
/// against a state-file backend.
pub fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading project file {}", args.config))?;
    let graph = cfg.to_graph()?;
    debug!(dag = %graph.name(), tasks = graph.len(), "built task graph");

    if let Command::Plan = args.command {
        let target = format!("{}.{}", cfg.target.database, cfg.target.schema);
        return print_plan(&graph, Some(&target));
    }

    let backend = StateFileBackend::open(
        Path::new(&args.state),
        &cfg.target.database,
        &cfg.target.schema,
    )
    .with_context(|| format!("opening state file {}", args.state))?;

    execute(&DagOperation::new(backend), &graph, args.command)
}

/// Run one subcommand against `dag_ops`.
pub fn execute<B: TaskBackend>(dag_ops: &DagOperation<B>, graph: &Graph, command: Command) -> Result<()> {
    match command {
        Command::Plan => print_plan(graph, None)?,
        Command::Deploy { mode } => {
            dag_ops.deploy(graph, mode)?;
            println!("deployed {} ({} task(s), mode {})", graph.name(), graph.len(), mode);
        }
        Command::Run { retry_last } => {
            dag_ops.run(graph, retry_last)?;
            println!("started a run of {}", graph.name());
        }
        Command::Drop { keep_finalizer } => match dag_ops.drop(graph, !keep_finalizer)? {
            DropOutcome::Dropped => println!("dropped {}", graph.name()),
            DropOutcome::AlreadyAbsent => println!("{} is not deployed", graph.name()),
        },
        Command::List { like } => {
            for name in dag_ops.iter_dags(&like)? {
                println!("{name}");
            }
        }
        Command::Runs { current, all } => {
            let runs = if current {
                dag_ops.get_current_dag_runs(graph)?
            } else {
                dag_ops.get_complete_dag_runs(graph, !all)?
            };
            info!(dag = %graph.name(), count = runs.len(), "fetched run history");
            for run in runs {
                println!("{run}");
            }
        }
    }
    Ok(())
}

fn print_plan(graph: &Graph, target: Option<&str>) -> Result<()> {
    let plan = ops::plan(graph)?;
    print!(
        "{}",
        PlanView {
            graph,
            plan: &plan,
            target,
        }
    );
    debug!("plan complete (no backend calls)");
    Ok(())
}

/// Human-readable rendering of a deploy plan.
struct PlanView<'a> {
    graph: &'a Graph,
    plan: &'a DeployPlan,
    target: Option<&'a str>,
}

impl fmt::Display for PlanView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "taskdag plan")?;
        if let Some(target) = self.target {
            writeln!(f, "  target = {target}")?;
        }
        writeln!(f, "  dag = {}", self.graph.name())?;
        match self.graph.schedule() {
            Some(schedule) => writeln!(f, "  schedule = {schedule}")?,
            None => writeln!(f, "  schedule = (none)")?,
        }
        writeln!(f)?;

        writeln!(f, "tasks ({}), in creation order:", self.plan.tasks.len())?;
        for (i, task) in self.plan.tasks.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, task.name)?;
            writeln!(f, "      body: {}", task.definition.summary())?;
            if !task.predecessors.is_empty() {
                writeln!(f, "      after: {:?}", task.predecessors)?;
            }
            if let Some(root) = &task.finalize {
                writeln!(f, "      finalizes: {root}")?;
            }
            if let Some(condition) = &task.condition {
                writeln!(f, "      when: {condition}")?;
            }
            if let Some(warehouse) = &task.warehouse {
                writeln!(f, "      warehouse: {warehouse}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::dag::Definition;

    fn branching_graph() -> Graph {
        let mut g = Graph::new("BR");
        let x = g.task("X", Definition::sql("select 'Y'")).branch().add().unwrap();
        let y = g.add_task("Y", Definition::sql("select 1")).unwrap();
        g.add_predecessors(y, x).unwrap();
        g
    }

    #[test]
    fn plan_view_lists_task_details() {
        let g = branching_graph();
        let plan = ops::plan(&g).unwrap();

        let shown = PlanView {
            graph: &g,
            plan: &plan,
            target: Some("DB.SCH"),
        }
        .to_string();

        assert!(shown.contains("  target = DB.SCH\n"));
        assert!(shown.contains("  schedule = (none)\n"));
        assert!(shown.contains("tasks (2), in creation order:"));
        assert!(shown.contains("  2. BR$Y\n"));
        assert!(shown.contains("      after: [\"BR$X\"]\n"));
        assert!(shown.contains("      when: SYSTEM$GET_PREDECESSOR_RETURN_VALUE('BR$X') = 'Y'\n"));
    }

    #[test]
    fn plan_view_without_target_skips_that_line() {
        let g = branching_graph();
        let plan = ops::plan(&g).unwrap();

        let shown = PlanView {
            graph: &g,
            plan: &plan,
            target: None,
        }
        .to_string();

        assert!(shown.starts_with("taskdag plan\n  dag = BR\n"));
        assert!(shown.contains("      when: "));
    }

    #[test]
    fn plan_subcommand_makes_no_backend_calls() {
        let backend = InMemoryBackend::new("DB", "SCH");
        let dag_ops = DagOperation::new(backend.clone());

        execute(&dag_ops, &branching_graph(), Command::Plan).unwrap();

        assert!(backend.calls().is_empty());
    }
}
