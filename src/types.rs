// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How `create` behaves when a task with the same name already exists.
///
/// - `ErrorIfExists`: fail with a conflict (default).
/// - `OrReplace`: replace the existing definition.
/// - `IfNotExists`: keep the existing definition and report success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CreateMode {
    #[default]
    ErrorIfExists,
    OrReplace,
    IfNotExists,
}

impl CreateMode {
    /// Wire alias of the mode (`errorIfExists`, `orReplace`, `ifNotExists`).
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateMode::ErrorIfExists => "errorIfExists",
            CreateMode::OrReplace => "orReplace",
            CreateMode::IfNotExists => "ifNotExists",
        }
    }
}

impl fmt::Display for CreateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreateMode {
    type Err = String;

    /// Accepts any casing with or without `_`/`-` separators, so
    /// `orReplace`, `or_replace`, `OR-REPLACE` all parse the same.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match folded.as_str() {
            "errorifexists" => Ok(CreateMode::ErrorIfExists),
            "orreplace" => Ok(CreateMode::OrReplace),
            "ifnotexists" => Ok(CreateMode::IfNotExists),
            _ => Err(format!(
                "invalid create mode: {} (expected \"errorIfExists\", \"orReplace\" or \"ifNotExists\")",
                s.trim()
            )),
        }
    }
}

/// Scheduling state of a single task on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Started,
    #[default]
    Suspended,
}

/// State of one graph run as reported by the backend's run history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Scheduled,
    Executing,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunState {
    /// Whether the run has reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Succeeded | RunState::Failed | RunState::Cancelled
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Scheduled => "SCHEDULED",
            RunState::Executing => "EXECUTING",
            RunState::Succeeded => "SUCCEEDED",
            RunState::Failed => "FAILED",
            RunState::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

impl FromStr for RunState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SCHEDULED" => Ok(RunState::Scheduled),
            "EXECUTING" => Ok(RunState::Executing),
            "SUCCEEDED" => Ok(RunState::Succeeded),
            "FAILED" => Ok(RunState::Failed),
            "CANCELLED" => Ok(RunState::Cancelled),
            other => Err(format!("invalid run state: {other}")),
        }
    }
}
