use std::time::Duration;

use taskdag::dag::{Definition, Graph, GraphSettings, ProcedureCall, TaskKind, TaskOptions};
use taskdag::errors::TaskdagError;

fn sql(text: &str) -> Definition {
    Definition::sql(text)
}

#[test]
fn full_names_join_graph_and_task_with_dollar() {
    let mut g = Graph::new("NIGHTLY_LOAD");
    let a = g.add_task("extract", sql("select 1")).unwrap();

    let task = g.get(a).unwrap();
    assert_eq!(task.name(), "extract");
    assert_eq!(task.full_name(), "NIGHTLY_LOAD$extract");
    assert_eq!(task.kind(), TaskKind::Plain);
    assert!(!task.is_finalizer());
}

#[test]
fn empty_task_name_is_rejected() {
    let mut g = Graph::new("G");
    let err = g.add_task("  ", sql("select 1")).unwrap_err();
    assert!(matches!(err, TaskdagError::InvalidTask(_)), "got {err:?}");
    assert!(g.is_empty());
}

#[test]
fn failed_add_leaves_graph_unchanged() {
    let mut g = Graph::new("G");
    g.add_task("A", sql("select 1")).unwrap();

    assert!(g.add_task("A", sql("select 2")).is_err());
    assert_eq!(g.len(), 1);
    assert_eq!(g.get_task("A").unwrap().definition(), &sql("select 1"));
}

#[test]
fn finalizer_is_registered_on_the_graph() {
    let mut g = Graph::new("G");
    assert!(g.finalizer().is_none());

    let f = g.task("CLEANUP", sql("select 1")).finalizer(true).add().unwrap();

    assert_eq!(g.finalizer().map(|t| t.id()), Some(f));
    assert!(g.get(f).unwrap().is_finalizer());
}

#[test]
fn edge_methods_reject_foreign_handles_without_side_effects() {
    let mut g1 = Graph::new("G1");
    let mut g2 = Graph::new("G2");
    let a = g1.add_task("A", sql("select 1")).unwrap();
    let b = g1.add_task("B", sql("select 2")).unwrap();
    let foreign = g2.add_task("X", sql("select 3")).unwrap();

    let err = g1.add_successors(a, [b, foreign]).unwrap_err();

    assert!(matches!(err, TaskdagError::InvalidOperation(_)), "got {err:?}");
    assert!(g1.get(b).unwrap().predecessors().is_empty());
}

#[test]
fn finalizer_cannot_appear_in_a_task_list() {
    let mut g = Graph::new("G");
    let a = g.add_task("A", sql("select 1")).unwrap();
    let b = g.add_task("B", sql("select 2")).unwrap();
    let f = g.task("F", sql("select 3")).finalizer(true).add().unwrap();

    assert!(matches!(
        g.add_predecessors(a, vec![b, f]),
        Err(TaskdagError::InvalidOperation(_))
    ));
    assert!(g.get(a).unwrap().predecessors().is_empty());
}

#[test]
fn precedes_and_follows_return_the_other_side() {
    let mut g = Graph::new("G");
    let a = g.add_task("A", sql("select 1")).unwrap();
    let b = g.add_task("B", sql("select 2")).unwrap();
    let c = g.add_task("C", sql("select 3")).unwrap();

    let next = g.precedes(a, b).unwrap();
    let last = g.precedes(next[0], c).unwrap();
    assert_eq!(last, vec![c]);

    let before = g.follows(c, [a]).unwrap();
    assert_eq!(before, vec![a]);
    assert_eq!(g.get(c).unwrap().predecessors(), &[b, a]);
}

#[test]
fn following_a_call_wraps_it_into_a_predecessor() {
    let mut g = Graph::new("G");
    let report = g.add_task("REPORT", sql("select 1")).unwrap();

    let created = g
        .follows(report, ProcedureCall::procedure("REFRESH_STATS").with_args(["full"]))
        .unwrap();

    let wrapped = g.get(created[0]).unwrap();
    assert_eq!(wrapped.full_name(), "G$REFRESH_STATS");
    assert_eq!(g.get(report).unwrap().predecessors(), created.as_slice());
}

#[test]
fn wrapping_a_call_whose_name_is_taken_fails() {
    let mut g = Graph::new("G");
    let a = g.add_task("LOAD_PROC", sql("select 1")).unwrap();

    let err = g
        .precedes(a, ProcedureCall::procedure("LOAD_PROC"))
        .unwrap_err();
    assert!(matches!(err, TaskdagError::DuplicateTask(_)), "got {err:?}");
}

#[test]
fn target_completion_interval_is_validated_on_add() {
    let mut g = Graph::new("G");
    let options = |interval| TaskOptions {
        target_completion_interval: Some(interval),
        ..TaskOptions::default()
    };

    g.task("OK", sql("select 1"))
        .serverless(true)
        .options(options(Duration::from_secs(30 * 60)))
        .add()
        .unwrap();

    let too_long = g
        .task("TOO_LONG", sql("select 1"))
        .serverless(true)
        .options(options(Duration::from_secs(25 * 3600)))
        .add()
        .unwrap_err();
    assert!(matches!(too_long, TaskdagError::InvalidTask(_)));

    let fractional = g
        .task("FRACTIONAL", sql("select 1"))
        .serverless(true)
        .options(options(Duration::from_secs(90)))
        .add()
        .unwrap_err();
    assert!(matches!(fractional, TaskdagError::InvalidTask(_)));

    assert_eq!(g.len(), 1);
}

#[test]
fn graph_settings_are_kept() {
    let settings = GraphSettings {
        comment: Some("nightly refresh".into()),
        task_auto_retry_attempts: Some(2),
        ..GraphSettings::default()
    };
    let g = Graph::with_settings("G", settings.clone());

    assert_eq!(g.settings(), &settings);
    assert!(g.schedule().is_none());
    assert_ne!(g.id(), Graph::new("G").id());
}
