use std::sync::{Arc, Mutex};

use taskdag::backend::{
    BackendCall, BackendError, BackendResult, InMemoryBackend, RawRun, TaskBackend,
    TaskDefinition,
};
use taskdag::types::CreateMode;

/// A backend that behaves like [`InMemoryBackend`] except for one chosen
/// call, which fails with a chosen error.
///
/// - The failing call is **not** forwarded, so it does not show up in
///   `inner().calls()`.
/// - Every call is recorded in `attempts()`, including the failing one.
#[derive(Clone)]
pub struct FailingBackend {
    inner: InMemoryBackend,
    trigger: BackendCall,
    error: BackendError,
    attempts: Arc<Mutex<Vec<BackendCall>>>,
}

impl FailingBackend {
    pub fn new(inner: InMemoryBackend, trigger: BackendCall, error: BackendError) -> Self {
        Self {
            inner,
            trigger,
            error,
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }

    pub fn attempts(&self) -> Vec<BackendCall> {
        self.attempts.lock().unwrap().clone()
    }

    fn check(&self, call: BackendCall) -> BackendResult<()> {
        let hit = call == self.trigger;
        self.attempts.lock().unwrap().push(call);
        if hit { Err(self.error.clone()) } else { Ok(()) }
    }
}

impl TaskBackend for FailingBackend {
    fn create(&self, task: &TaskDefinition, mode: CreateMode) -> BackendResult<()> {
        self.check(BackendCall::Create {
            name: task.name.clone(),
            mode,
        })?;
        self.inner.create(task, mode)
    }

    fn fetch(&self, name: &str) -> BackendResult<TaskDefinition> {
        self.check(BackendCall::Fetch(name.to_string()))?;
        self.inner.fetch(name)
    }

    fn execute(&self, name: &str, retry_last: bool) -> BackendResult<()> {
        self.check(BackendCall::Execute {
            name: name.to_string(),
            retry_last,
        })?;
        self.inner.execute(name, retry_last)
    }

    fn suspend(&self, name: &str) -> BackendResult<()> {
        self.check(BackendCall::Suspend(name.to_string()))?;
        self.inner.suspend(name)
    }

    fn resume(&self, name: &str) -> BackendResult<()> {
        self.check(BackendCall::Resume(name.to_string()))?;
        self.inner.resume(name)
    }

    fn drop_task(&self, name: &str) -> BackendResult<()> {
        self.check(BackendCall::Drop(name.to_string()))?;
        self.inner.drop_task(name)
    }

    fn fetch_dependents(&self, name: &str) -> BackendResult<Vec<TaskDefinition>> {
        self.check(BackendCall::FetchDependents(name.to_string()))?;
        self.inner.fetch_dependents(name)
    }

    fn list_completed_runs(&self, root_name: &str, error_only: bool) -> BackendResult<Vec<RawRun>> {
        self.check(BackendCall::ListCompletedRuns {
            root: root_name.to_string(),
            error_only,
        })?;
        self.inner.list_completed_runs(root_name, error_only)
    }

    fn list_current_runs(&self, root_name: &str) -> BackendResult<Vec<RawRun>> {
        self.check(BackendCall::ListCurrentRuns(root_name.to_string()))?;
        self.inner.list_current_runs(root_name)
    }

    fn list_roots(&self, like: &str) -> BackendResult<Vec<String>> {
        self.check(BackendCall::ListRoots(like.to_string()))?;
        self.inner.list_roots(like)
    }
}
