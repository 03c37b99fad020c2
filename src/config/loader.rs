// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Read and deserialize a project file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Read a project file and validate it.
///
/// Checks task bodies, `after` references, finalizer placement, schedule
/// syntax and acyclicity. The result converts to a graph with
/// [`ConfigFile::to_graph`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    debug!(
        path = %path.as_ref().display(),
        dag = %config.dag.name,
        tasks = config.task.len(),
        "loaded project file"
    );
    Ok(config)
}

/// `Taskdag.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Taskdag.toml")
}

/// `.taskdag/state.toml` in the current working directory.
pub fn default_state_path() -> PathBuf {
    PathBuf::from(".taskdag").join("state.toml")
}
