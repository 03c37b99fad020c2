//! Small graphs shared by the integration tests.

use taskdag::dag::{Definition, Graph, GraphSettings, Schedule};

fn sql(name: &str) -> Definition {
    Definition::sql(format!("select '{name}'"))
}

/// `A` feeds `B` and `C`.
pub fn fan_out(name: &str) -> Graph {
    let mut g = Graph::new(name);
    let a = g.add_task("A", sql("A")).expect("add A");
    let b = g.add_task("B", sql("B")).expect("add B");
    let c = g.add_task("C", sql("C")).expect("add C");
    g.add_predecessors(b, a).expect("A -> B");
    g.add_predecessors(c, a).expect("A -> C");
    g
}

/// `A` and `B` each wait for the other.
pub fn two_cycle(name: &str) -> Graph {
    let mut g = Graph::new(name);
    let a = g.add_task("A", sql("A")).expect("add A");
    let b = g.add_task("B", sql("B")).expect("add B");
    g.add_predecessors(a, b).expect("B -> A");
    g.add_predecessors(b, a).expect("A -> B");
    g
}

/// Branch task `X` choosing between `Y` and `Z`.
pub fn branch(name: &str) -> Graph {
    let mut g = Graph::new(name);
    let x = g
        .task("X", sql("Y"))
        .branch()
        .add()
        .expect("add X");
    let y = g.add_task("Y", sql("Y")).expect("add Y");
    let z = g.add_task("Z", sql("Z")).expect("add Z");
    g.add_successors(x, [y, z]).expect("X -> Y, Z");
    g
}

/// Linear chain `T0 -> T1 -> ... -> T{len-1}`.
pub fn chain(name: &str, len: usize) -> Graph {
    let mut g = Graph::new(name);
    let mut prev = None;
    for i in 0..len {
        let id = g
            .add_task(format!("T{i}"), sql(&format!("T{i}")))
            .expect("add chain task");
        if let Some(prev) = prev {
            g.add_predecessors(id, prev).expect("chain edge");
        }
        prev = Some(id);
    }
    g
}

/// Hourly `fan_out` graph with a finalizer `CLEANUP`.
pub fn scheduled_with_finalizer(name: &str) -> Graph {
    let settings = GraphSettings {
        schedule: Some(Schedule::Interval { minutes: 60 }),
        warehouse: Some("ETL_WH".to_string()),
        ..GraphSettings::default()
    };
    let mut g = Graph::with_settings(name, settings);
    let a = g.add_task("A", sql("A")).expect("add A");
    let b = g.add_task("B", sql("B")).expect("add B");
    g.add_predecessors(b, a).expect("A -> B");
    g.task("CLEANUP", sql("CLEANUP"))
        .finalizer(true)
        .add()
        .expect("add CLEANUP");
    g
}
