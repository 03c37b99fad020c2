// src/dag/linearize.rs

use std::collections::VecDeque;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::graph::{Graph, TaskId};
use crate::errors::{Result, TaskdagError};

/// Order the graph's tasks so that every task comes after all of its
/// predecessors.
///
/// Works sink-first: a task is emitted once every task that names it as a
/// predecessor has been emitted, then the result is reversed. Ties follow
/// insertion order, so the same graph always yields the same order.
pub fn topological_order(graph: &Graph) -> Result<Vec<TaskId>> {
    let tasks: Vec<_> = graph.tasks().collect();

    // dependents[i] = how many tasks name task i as a predecessor
    let mut dependents = vec![0usize; tasks.len()];
    for task in &tasks {
        for pred in task.predecessors() {
            dependents[pred.index()] += 1;
        }
    }

    let mut queue: VecDeque<usize> = dependents
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(tasks.len());
    while let Some(i) = queue.pop_front() {
        let task = tasks[i];
        order.push(task.id());
        for pred in task.predecessors() {
            let count = &mut dependents[pred.index()];
            *count -= 1;
            if *count == 0 {
                queue.push_back(pred.index());
            }
        }
    }

    if order.len() < tasks.len() {
        return Err(cycle_error(graph));
    }

    order.reverse();
    Ok(order)
}

/// Describe a cycle in `graph`, naming one task on it.
fn cycle_error(graph: &Graph) -> TaskdagError {
    // Edge direction: predecessor -> dependent.
    let mut edges: DiGraphMap<&str, ()> = DiGraphMap::new();
    for task in graph.tasks() {
        edges.add_node(task.name());
        for pred in task.predecessors() {
            if let Ok(pred) = graph.get(*pred) {
                edges.add_edge(pred.name(), task.name(), ());
            }
        }
    }

    match toposort(&edges, None) {
        Err(cycle) => TaskdagError::DagCycle(format!(
            "there is a cycle in the task graph '{}' involving task '{}'",
            graph.name(),
            cycle.node_id()
        )),
        Ok(_) => TaskdagError::DagCycle(format!(
            "there is a cycle in the task graph '{}'",
            graph.name()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::definition::Definition;

    fn names(graph: &Graph, order: &[TaskId]) -> Vec<String> {
        order
            .iter()
            .map(|id| graph.get(*id).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn fan_out_places_source_first() {
        let mut g = Graph::new("G1");
        let a = g.add_task("A", Definition::sql("select 1")).unwrap();
        let b = g.add_task("B", Definition::sql("select 1")).unwrap();
        let c = g.add_task("C", Definition::sql("select 1")).unwrap();
        g.add_predecessors(b, a).unwrap();
        g.add_predecessors(c, a).unwrap();

        let order = topological_order(&g).unwrap();
        assert_eq!(names(&g, &order), vec!["A", "C", "B"]);
        assert_eq!(topological_order(&g).unwrap(), order);
    }

    #[test]
    fn chain_declared_backwards() {
        let mut g = Graph::new("G");
        let c = g.add_task("C", Definition::sql("select 1")).unwrap();
        let b = g.add_task("B", Definition::sql("select 1")).unwrap();
        let a = g.add_task("A", Definition::sql("select 1")).unwrap();
        g.add_predecessors(c, b).unwrap();
        g.add_predecessors(b, a).unwrap();

        let order = topological_order(&g).unwrap();
        assert_eq!(names(&g, &order), vec!["A", "B", "C"]);
    }

    #[test]
    fn two_task_cycle_is_reported() {
        let mut g = Graph::new("G2");
        let a = g.add_task("A", Definition::sql("select 1")).unwrap();
        let b = g.add_task("B", Definition::sql("select 1")).unwrap();
        g.add_predecessors(a, b).unwrap();
        g.add_predecessors(b, a).unwrap();

        let err = topological_order(&g).unwrap_err();
        match err {
            TaskdagError::DagCycle(msg) => {
                assert!(msg.contains("G2"));
                assert!(msg.contains("'A'") || msg.contains("'B'"));
            }
            other => panic!("expected DagCycle, got {other:?}"),
        }
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut g = Graph::new("G");
        let a = g.add_task("A", Definition::sql("select 1")).unwrap();
        g.add_predecessors(a, a).unwrap();
        assert!(matches!(topological_order(&g), Err(TaskdagError::DagCycle(_))));
    }

    #[test]
    fn empty_graph_has_empty_order() {
        assert!(topological_order(&Graph::new("EMPTY")).unwrap().is_empty());
    }
}
