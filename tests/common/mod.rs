#![allow(dead_code)]

use taskdag::backend::{BackendCall, InMemoryBackend};
use taskdag::ops::DagOperation;

pub use taskdag_test_utils::init_tracing;

/// Fresh in-memory backend plus an orchestrator sharing its state.
pub fn setup() -> (InMemoryBackend, DagOperation<InMemoryBackend>) {
    init_tracing();
    let backend = InMemoryBackend::new("DB", "SCH");
    let ops = DagOperation::new(backend.clone());
    (backend, ops)
}

/// Calls that changed backend state, in order.
pub fn mutations(backend: &InMemoryBackend) -> Vec<BackendCall> {
    backend
        .calls()
        .into_iter()
        .filter(BackendCall::is_mutation)
        .collect()
}

/// Position of `call` in `calls`, panicking with the full log if absent.
pub fn position(calls: &[BackendCall], call: &BackendCall) -> usize {
    calls
        .iter()
        .position(|c| c == call)
        .unwrap_or_else(|| panic!("{call:?} not found in {calls:#?}"))
}

pub fn create(name: &str, mode: taskdag::types::CreateMode) -> BackendCall {
    BackendCall::Create {
        name: name.to_string(),
        mode,
    }
}
