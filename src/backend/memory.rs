// src/backend/memory.rs

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BackendError, BackendResult, RawRun, TaskBackend, TaskDefinition, TaskRelations};
use crate::ident;
use crate::types::{CreateMode, RunState, TaskState};

/// One request received by an [`InMemoryBackend`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Create { name: String, mode: CreateMode },
    Fetch(String),
    Execute { name: String, retry_last: bool },
    Suspend(String),
    Resume(String),
    Drop(String),
    FetchDependents(String),
    ListCompletedRuns { root: String, error_only: bool },
    ListCurrentRuns(String),
    ListRoots(String),
}

impl BackendCall {
    /// Whether the call changes backend state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            BackendCall::Create { .. }
                | BackendCall::Execute { .. }
                | BackendCall::Suspend(_)
                | BackendCall::Resume(_)
                | BackendCall::Drop(_)
        )
    }
}

/// Serializable copy of everything an [`InMemoryBackend`] holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendSnapshot {
    pub database: String,
    pub schema: String,
    #[serde(default)]
    pub next_run_id: i64,
    /// Tasks in creation order.
    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,
    #[serde(default)]
    pub completed_runs: Vec<RawRun>,
    #[serde(default)]
    pub current_runs: Vec<RawRun>,
}

#[derive(Debug, Default)]
struct Store {
    database: String,
    schema: String,
    tasks: IndexMap<String, TaskDefinition>,
    completed_runs: Vec<RawRun>,
    current_runs: Vec<RawRun>,
    next_run_id: i64,
    calls: Vec<BackendCall>,
}

impl Store {
    fn qualified(&self, name: &str) -> String {
        format!("{}.{}.{}", self.database, self.schema, name)
    }

    fn get(&self, name: &str) -> BackendResult<&TaskDefinition> {
        self.tasks
            .get(name)
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }

    fn get_mut(&mut self, name: &str) -> BackendResult<&mut TaskDefinition> {
        self.tasks
            .get_mut(name)
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }

    fn new_run(&mut self, root: &str, state: RunState) -> RawRun {
        self.next_run_id += 1;
        let now = Utc::now();
        RawRun {
            root_task_name: root.to_string(),
            database_name: self.database.clone(),
            schema_name: self.schema.clone(),
            state,
            first_error_task_name: None,
            first_error_code: None,
            first_error_message: None,
            scheduled_time: Some(now),
            query_start_time: Some(now),
            next_scheduled_time: None,
            run_id: self.next_run_id,
            graph_version: 1,
        }
    }
}

/// In-process backend bound to one `database.schema` namespace.
///
/// Cloning is cheap and clones share state, so a test can hand one clone to
/// the orchestrator and inspect another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    store: Arc<Mutex<Store>>,
}

impl InMemoryBackend {
    pub fn new(database: impl Into<String>, schema: impl Into<String>) -> Self {
        let store = Store {
            database: database.into(),
            schema: schema.into(),
            ..Store::default()
        };
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    pub fn from_snapshot(snapshot: BackendSnapshot) -> Self {
        let tasks = snapshot
            .tasks
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();
        let store = Store {
            database: snapshot.database,
            schema: snapshot.schema,
            tasks,
            completed_runs: snapshot.completed_runs,
            current_runs: snapshot.current_runs,
            next_run_id: snapshot.next_run_id,
            calls: Vec::new(),
        };
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    pub fn snapshot(&self) -> BackendResult<BackendSnapshot> {
        let store = self.lock()?;
        Ok(BackendSnapshot {
            database: store.database.clone(),
            schema: store.schema.clone(),
            next_run_id: store.next_run_id,
            tasks: store.tasks.values().cloned().collect(),
            completed_runs: store.completed_runs.clone(),
            current_runs: store.current_runs.clone(),
        })
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().map(|s| s.calls.clone()).unwrap_or_default()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut store) = self.lock() {
            store.calls.clear();
        }
    }

    /// Names of stored tasks in creation order.
    pub fn task_names(&self) -> Vec<String> {
        self.lock()
            .map(|s| s.tasks.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn state_of(&self, name: &str) -> Option<TaskState> {
        self.lock().ok()?.tasks.get(name).and_then(|t| t.state)
    }

    /// Append a finished run to the run history.
    pub fn push_completed_run(&self, run: RawRun) -> BackendResult<()> {
        self.lock()?.completed_runs.push(run);
        Ok(())
    }

    /// Append a finished run for `root` with the given state.
    pub fn complete_run(&self, root: &str, state: RunState) -> BackendResult<RawRun> {
        let mut store = self.lock()?;
        let run = store.new_run(root, state);
        store.completed_runs.push(run.clone());
        Ok(run)
    }

    fn lock(&self) -> BackendResult<MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|e| BackendError::Storage(format!("backend state lock poisoned: {e}")))
    }

    fn record(&self, call: BackendCall) -> BackendResult<MutexGuard<'_, Store>> {
        let mut store = self.lock()?;
        store.calls.push(call);
        Ok(store)
    }
}

impl TaskBackend for InMemoryBackend {
    fn create(&self, task: &TaskDefinition, mode: CreateMode) -> BackendResult<()> {
        let mut store = self.record(BackendCall::Create {
            name: task.name.clone(),
            mode,
        })?;

        if store.tasks.contains_key(&task.name) {
            match mode {
                CreateMode::ErrorIfExists => return Err(BackendError::Conflict(task.name.clone())),
                CreateMode::IfNotExists => {
                    debug!(task = %task.name, "task exists; keeping existing definition");
                    return Ok(());
                }
                CreateMode::OrReplace => {}
            }
        }

        if !task.predecessors.is_empty() && task.schedule.is_some() {
            return Err(BackendError::Rejected(format!(
                "task '{}' cannot have both a schedule and predecessors",
                task.name
            )));
        }
        for pred in &task.predecessors {
            if !store.tasks.contains_key(pred) {
                return Err(BackendError::Rejected(format!(
                    "predecessor '{}' of task '{}' does not exist",
                    pred, task.name
                )));
            }
        }

        if let Some(root) = &task.finalize {
            let qualified = store.qualified(&task.name);
            let root_task = store.get_mut(root).map_err(|_| {
                BackendError::Rejected(format!(
                    "root task '{}' finalized by '{}' does not exist",
                    root, task.name
                ))
            })?;
            let relations = root_task.task_relations.get_or_insert_with(TaskRelations::default);
            if let Some(existing) = &relations.finalizer_task {
                if ident::short_name(existing) != task.name {
                    return Err(BackendError::Rejected(format!(
                        "root task '{}' already has finalizer '{}'",
                        root, existing
                    )));
                }
            }
            relations.finalizer_task = Some(qualified);
        }

        let mut stored = task.clone();
        stored.state = Some(TaskState::Suspended);
        stored.database_name = Some(store.database.clone());
        stored.schema_name = Some(store.schema.clone());
        stored.created_on = Some(Utc::now());
        stored.task_relations = Some(TaskRelations {
            predecessors: task.predecessors.clone(),
            finalizer_task: store
                .tasks
                .get(&task.name)
                .and_then(|t| t.finalizer_task().map(str::to_string)),
            finalized_root_task: task.finalize.clone(),
        });

        debug!(task = %task.name, %mode, "stored task definition");
        store.tasks.insert(task.name.clone(), stored);
        Ok(())
    }

    fn fetch(&self, name: &str) -> BackendResult<TaskDefinition> {
        let store = self.record(BackendCall::Fetch(name.to_string()))?;
        store.get(name).cloned()
    }

    fn execute(&self, name: &str, retry_last: bool) -> BackendResult<()> {
        let mut store = self.record(BackendCall::Execute {
            name: name.to_string(),
            retry_last,
        })?;
        store.get(name)?;

        if retry_last {
            let last = store
                .completed_runs
                .iter()
                .rev()
                .find(|r| r.root_task_name == name);
            if !matches!(last, Some(run) if run.state == RunState::Failed) {
                return Err(BackendError::Rejected(format!(
                    "no failed graph run of '{name}' to retry"
                )));
            }
        }

        let run = store.new_run(name, RunState::Executing);
        store.current_runs.push(run);
        Ok(())
    }

    fn suspend(&self, name: &str) -> BackendResult<()> {
        let mut store = self.record(BackendCall::Suspend(name.to_string()))?;
        store.get_mut(name)?.state = Some(TaskState::Suspended);
        Ok(())
    }

    fn resume(&self, name: &str) -> BackendResult<()> {
        let mut store = self.record(BackendCall::Resume(name.to_string()))?;
        store.get_mut(name)?.state = Some(TaskState::Started);
        Ok(())
    }

    fn drop_task(&self, name: &str) -> BackendResult<()> {
        let mut store = self.record(BackendCall::Drop(name.to_string()))?;
        if store.get(name)?.is_started() {
            return Err(BackendError::Rejected(format!(
                "task '{name}' must be suspended before it is dropped"
            )));
        }

        if let Some(dropped) = store.tasks.shift_remove(name) {
            if let Some(root) = dropped.finalize {
                if let Some(relations) = store
                    .tasks
                    .get_mut(&root)
                    .and_then(|r| r.task_relations.as_mut())
                {
                    relations.finalizer_task = None;
                }
            }
        }
        Ok(())
    }

    fn fetch_dependents(&self, name: &str) -> BackendResult<Vec<TaskDefinition>> {
        let store = self.record(BackendCall::FetchDependents(name.to_string()))?;
        let start = store.get(name)?;

        let mut reachable: HashSet<&str> = HashSet::from([name]);
        let mut queue: VecDeque<&str> = VecDeque::from([name]);
        while let Some(current) = queue.pop_front() {
            for task in store.tasks.values() {
                let is_child = task.predecessors.iter().any(|p| p == current)
                    || task.finalize.as_deref() == Some(current);
                if is_child && reachable.insert(task.name.as_str()) {
                    queue.push_back(task.name.as_str());
                }
            }
        }

        // Creation order is topological: predecessors must exist on create.
        let mut ordered = vec![start.clone()];
        ordered.extend(
            store
                .tasks
                .values()
                .filter(|t| t.name != name && reachable.contains(t.name.as_str()))
                .cloned(),
        );
        Ok(ordered)
    }

    fn list_completed_runs(&self, root_name: &str, error_only: bool) -> BackendResult<Vec<RawRun>> {
        let store = self.record(BackendCall::ListCompletedRuns {
            root: root_name.to_string(),
            error_only,
        })?;
        Ok(store
            .completed_runs
            .iter()
            .filter(|r| r.root_task_name == root_name)
            .filter(|r| !error_only || r.state == RunState::Failed)
            .cloned()
            .collect())
    }

    fn list_current_runs(&self, root_name: &str) -> BackendResult<Vec<RawRun>> {
        let store = self.record(BackendCall::ListCurrentRuns(root_name.to_string()))?;
        Ok(store
            .current_runs
            .iter()
            .filter(|r| r.root_task_name == root_name)
            .cloned()
            .collect())
    }

    fn list_roots(&self, like: &str) -> BackendResult<Vec<String>> {
        let store = self.record(BackendCall::ListRoots(like.to_string()))?;
        let pattern =
            ident::like_pattern(like).map_err(|e| BackendError::Rejected(e.to_string()))?;

        Ok(store
            .tasks
            .values()
            .filter(|t| t.predecessors.is_empty() && t.finalize.is_none())
            .filter(|t| pattern.is_match(&t.name))
            .map(|t| t.name.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Definition;

    fn task(name: &str, preds: &[&str]) -> TaskDefinition {
        let mut t = TaskDefinition::new(name, Definition::sql("select 1"));
        t.predecessors = preds.iter().map(|p| p.to_string()).collect();
        t
    }

    #[test]
    fn create_respects_mode() {
        let backend = InMemoryBackend::new("DB", "SCH");
        backend.create(&task("R", &[]), CreateMode::ErrorIfExists).unwrap();

        let err = backend
            .create(&task("R", &[]), CreateMode::ErrorIfExists)
            .unwrap_err();
        assert_eq!(err, BackendError::Conflict("R".into()));

        backend.create(&task("R", &[]), CreateMode::IfNotExists).unwrap();
        backend.create(&task("R", &[]), CreateMode::OrReplace).unwrap();
        assert_eq!(backend.task_names(), vec!["R".to_string()]);
    }

    #[test]
    fn create_rejects_unknown_predecessor() {
        let backend = InMemoryBackend::new("DB", "SCH");
        let err = backend
            .create(&task("A", &["MISSING"]), CreateMode::ErrorIfExists)
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected(msg) if msg.contains("MISSING")));
    }

    #[test]
    fn new_tasks_start_suspended_and_cannot_drop_while_started() {
        let backend = InMemoryBackend::new("DB", "SCH");
        backend.create(&task("R", &[]), CreateMode::ErrorIfExists).unwrap();
        assert_eq!(backend.state_of("R"), Some(TaskState::Suspended));

        backend.resume("R").unwrap();
        assert!(matches!(
            backend.drop_task("R"),
            Err(BackendError::Rejected(_))
        ));

        backend.suspend("R").unwrap();
        backend.drop_task("R").unwrap();
        assert_eq!(backend.drop_task("R"), Err(BackendError::NotFound("R".into())));
    }

    #[test]
    fn dependents_follow_creation_order_and_include_finalizer() {
        let backend = InMemoryBackend::new("DB", "SCH");
        backend.create(&task("R", &[]), CreateMode::ErrorIfExists).unwrap();
        backend.create(&task("R$A", &["R"]), CreateMode::ErrorIfExists).unwrap();
        backend.create(&task("R$B", &["R$A"]), CreateMode::ErrorIfExists).unwrap();
        let mut fin = task("R$FIN", &[]);
        fin.finalize = Some("R".into());
        backend.create(&fin, CreateMode::ErrorIfExists).unwrap();

        let names: Vec<String> = backend
            .fetch_dependents("R")
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["R", "R$A", "R$B", "R$FIN"]);

        let root = backend.fetch("R").unwrap();
        assert_eq!(root.finalizer_task(), Some("DB.SCH.R$FIN"));
    }

    #[test]
    fn list_roots_filters_by_like_pattern() {
        let backend = InMemoryBackend::new("DB", "SCH");
        backend.create(&task("NIGHTLY", &[]), CreateMode::ErrorIfExists).unwrap();
        backend.create(&task("HOURLY", &[]), CreateMode::ErrorIfExists).unwrap();
        backend
            .create(&task("NIGHTLY$A", &["NIGHTLY"]), CreateMode::ErrorIfExists)
            .unwrap();

        assert_eq!(backend.list_roots("night%").unwrap(), vec!["NIGHTLY"]);
        assert_eq!(backend.list_roots("%").unwrap(), vec!["NIGHTLY", "HOURLY"]);
    }

    #[test]
    fn retry_last_requires_a_failed_run() {
        let backend = InMemoryBackend::new("DB", "SCH");
        backend.create(&task("R", &[]), CreateMode::ErrorIfExists).unwrap();
        assert!(backend.execute("R", true).is_err());

        backend.complete_run("R", RunState::Failed).unwrap();
        backend.execute("R", true).unwrap();
        assert_eq!(backend.list_current_runs("R").unwrap().len(), 1);
    }
}
