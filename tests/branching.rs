mod common;

use common::setup;
use taskdag::backend::TaskBackend;
use taskdag::dag::{Definition, Graph, ProcedureCall};
use taskdag::errors::TaskdagError;
use taskdag::types::CreateMode;
use taskdag_test_utils::fixtures;

fn sql(text: &str) -> Definition {
    Definition::sql(text)
}

fn condition_of<'g>(g: &'g Graph, name: &str) -> Option<&'g str> {
    g.get_task(name).and_then(|t| t.condition())
}

#[test]
fn branch_successors_check_the_branch_return_value() {
    let g = fixtures::branch("BR");

    assert_eq!(
        condition_of(&g, "Y"),
        Some("SYSTEM$GET_PREDECESSOR_RETURN_VALUE('BR$X') = 'Y'")
    );
    assert_eq!(
        condition_of(&g, "Z"),
        Some("SYSTEM$GET_PREDECESSOR_RETURN_VALUE('BR$X') = 'Z'")
    );
    assert_eq!(condition_of(&g, "X"), None);
}

#[test]
fn injected_check_is_prepended_to_existing_condition() {
    let mut g = Graph::new("BR");
    let x = g.task("X", sql("select 'Y'")).branch().add().unwrap();
    let y = g
        .task("Y", sql("select 1"))
        .condition("1 = 1")
        .add()
        .unwrap();

    g.add_predecessors(y, x).unwrap();

    assert_eq!(
        condition_of(&g, "Y"),
        Some("SYSTEM$GET_PREDECESSOR_RETURN_VALUE('BR$X') = 'Y' and 1 = 1")
    );
}

#[test]
fn two_branch_predecessors_compose_newest_first() {
    let mut g = Graph::new("BR");
    let x1 = g.task("X1", sql("select 'J'")).branch().add().unwrap();
    let x2 = g.task("X2", sql("select 'J'")).branch().add().unwrap();
    let j = g.add_task("J", sql("select 1")).unwrap();

    g.add_predecessors(j, x1).unwrap();
    g.add_predecessors(j, x2).unwrap();

    assert_eq!(
        condition_of(&g, "J"),
        Some(
            "SYSTEM$GET_PREDECESSOR_RETURN_VALUE('BR$X2') = 'J' and \
             SYSTEM$GET_PREDECESSOR_RETURN_VALUE('BR$X1') = 'J'"
        )
    );
}

#[test]
fn plain_predecessors_leave_conditions_alone() {
    let mut g = Graph::new("G");
    let a = g.add_task("A", sql("select 1")).unwrap();
    let b = g
        .task("B", sql("select 2"))
        .condition("1 = 1")
        .add()
        .unwrap();
    let c = g.add_task("C", sql("select 3")).unwrap();

    g.add_successors(a, [b, c]).unwrap();

    assert_eq!(condition_of(&g, "B"), Some("1 = 1"));
    assert_eq!(condition_of(&g, "C"), None);
}

#[test]
fn repeating_a_branch_edge_does_not_repeat_the_check() {
    let mut g = fixtures::branch("BR");
    let x = g.get_task("X").unwrap().id();
    let y = g.get_task("Y").unwrap().id();

    g.add_predecessors(y, x).unwrap();

    assert_eq!(
        condition_of(&g, "Y"),
        Some("SYSTEM$GET_PREDECESSOR_RETURN_VALUE('BR$X') = 'Y'")
    );
}

#[test]
fn branch_name_is_normalized_for_the_backend() {
    let g = fixtures::branch("nightly");
    assert_eq!(
        condition_of(&g, "Y"),
        Some("SYSTEM$GET_PREDECESSOR_RETURN_VALUE('NIGHTLY$X') = 'Y'")
    );

    let g = fixtures::branch("my dag");
    assert_eq!(
        condition_of(&g, "Z"),
        Some("SYSTEM$GET_PREDECESSOR_RETURN_VALUE('\"my dag$X\"') = 'Z'")
    );
}

#[test]
fn calls_wrapped_as_branch_successors_get_a_check() {
    let mut g = Graph::new("BR");
    let x = g.task("X", sql("select 'LOAD_PROC'")).branch().add().unwrap();

    let created = g.precedes(x, ProcedureCall::procedure("LOAD_PROC")).unwrap();

    let wrapped = g.get(created[0]).unwrap();
    assert_eq!(wrapped.name(), "LOAD_PROC");
    assert_eq!(
        wrapped.condition(),
        Some("SYSTEM$GET_PREDECESSOR_RETURN_VALUE('BR$X') = 'LOAD_PROC'")
    );
}

#[test]
fn rejected_branch_check_leaves_the_graph_untouched() {
    // quoted full name `"a$b"c"` has an undoubled inner quote
    let mut g = Graph::new("\"a");
    let x = g.task("b\"c\"", sql("select 'Y'")).branch().add().unwrap();
    let y = g.add_task("Y", sql("select 1")).unwrap();
    let z = g.task("Z", sql("select 2")).condition("1 = 1").add().unwrap();

    assert!(matches!(g.add_predecessors(y, x), Err(TaskdagError::InvalidTask(_))));
    assert!(g.get(y).unwrap().predecessors().is_empty());
    assert_eq!(g.get(y).unwrap().condition(), None);

    assert!(g.add_successors(x, [y, z]).is_err());
    assert!(g.get(z).unwrap().predecessors().is_empty());
    assert_eq!(g.get(z).unwrap().condition(), Some("1 = 1"));

    assert!(g.precedes(x, ProcedureCall::procedure("LOAD_PROC")).is_err());
    assert!(g.get_task("LOAD_PROC").is_none());
    assert_eq!(g.len(), 3);
}

#[test]
fn conditions_reach_the_backend() {
    let (backend, ops) = setup();
    let g = fixtures::branch("BR");

    ops.deploy(&g, CreateMode::ErrorIfExists).unwrap();

    let y = backend.fetch("BR$Y").unwrap();
    assert_eq!(
        y.condition.as_deref(),
        Some("SYSTEM$GET_PREDECESSOR_RETURN_VALUE('BR$X') = 'Y'")
    );
    assert_eq!(y.predecessors, vec!["BR$X"]);
    assert_eq!(backend.fetch("BR$X").unwrap().condition, None);
}
