// src/backend/state_file.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::memory::{BackendSnapshot, InMemoryBackend};
use super::{BackendError, BackendResult, RawRun, TaskBackend, TaskDefinition};
use crate::types::CreateMode;

/// Backend that keeps its state in a TOML file.
///
/// The file is read once on [`StateFileBackend::open`] and rewritten after
/// every successful mutating call, so consecutive CLI invocations see each
/// other's deployments.
#[derive(Debug, Clone)]
pub struct StateFileBackend {
    path: PathBuf,
    inner: InMemoryBackend,
}

impl StateFileBackend {
    /// Open (or start) the state file at `path` for the given namespace.
    ///
    /// A missing file means an empty namespace. An existing file recorded for
    /// a different `database.schema` is refused.
    pub fn open(path: &Path, database: &str, schema: &str) -> BackendResult<Self> {
        let inner = if path.exists() {
            let contents = fs::read_to_string(path).map_err(|e| {
                BackendError::Storage(format!("reading state file {}: {e}", path.display()))
            })?;
            let snapshot: BackendSnapshot = toml::from_str(&contents).map_err(|e| {
                BackendError::Storage(format!("parsing state file {}: {e}", path.display()))
            })?;

            if !snapshot.database.eq_ignore_ascii_case(database)
                || !snapshot.schema.eq_ignore_ascii_case(schema)
            {
                return Err(BackendError::Storage(format!(
                    "state file {} belongs to {}.{}, not {}.{}",
                    path.display(),
                    snapshot.database,
                    snapshot.schema,
                    database,
                    schema
                )));
            }

            debug!(path = %path.display(), tasks = snapshot.tasks.len(), "loaded backend state");
            InMemoryBackend::from_snapshot(snapshot)
        } else {
            debug!(path = %path.display(), "no state file yet; starting empty");
            InMemoryBackend::new(database, schema)
        };

        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-process state behind this backend.
    pub fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }

    fn save(&self) -> BackendResult<()> {
        let snapshot = self.inner.snapshot()?;
        let contents = toml::to_string_pretty(&snapshot)
            .map_err(|e| BackendError::Storage(format!("serializing backend state: {e}")))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    BackendError::Storage(format!("creating dir {}: {e}", parent.display()))
                })?;
            }
        }
        fs::write(&self.path, contents).map_err(|e| {
            BackendError::Storage(format!("writing state file {}: {e}", self.path.display()))
        })?;

        trace!(path = %self.path.display(), "saved backend state");
        Ok(())
    }

    fn persist<T>(&self, result: BackendResult<T>) -> BackendResult<T> {
        let value = result?;
        self.save()?;
        Ok(value)
    }
}

impl TaskBackend for StateFileBackend {
    fn create(&self, task: &TaskDefinition, mode: CreateMode) -> BackendResult<()> {
        self.persist(self.inner.create(task, mode))
    }

    fn fetch(&self, name: &str) -> BackendResult<TaskDefinition> {
        self.inner.fetch(name)
    }

    fn execute(&self, name: &str, retry_last: bool) -> BackendResult<()> {
        self.persist(self.inner.execute(name, retry_last))
    }

    fn suspend(&self, name: &str) -> BackendResult<()> {
        self.persist(self.inner.suspend(name))
    }

    fn resume(&self, name: &str) -> BackendResult<()> {
        self.persist(self.inner.resume(name))
    }

    fn drop_task(&self, name: &str) -> BackendResult<()> {
        self.persist(self.inner.drop_task(name))
    }

    fn fetch_dependents(&self, name: &str) -> BackendResult<Vec<TaskDefinition>> {
        self.inner.fetch_dependents(name)
    }

    fn list_completed_runs(&self, root_name: &str, error_only: bool) -> BackendResult<Vec<RawRun>> {
        self.inner.list_completed_runs(root_name, error_only)
    }

    fn list_current_runs(&self, root_name: &str) -> BackendResult<Vec<RawRun>> {
        self.inner.list_current_runs(root_name)
    }

    fn list_roots(&self, like: &str) -> BackendResult<Vec<String>> {
        self.inner.list_roots(like)
    }
}
