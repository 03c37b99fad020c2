// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::dag::{Definition, ProcedureCall};

/// Top-level project file as read from TOML, before validation.
///
/// ```toml
/// [target]
/// database = "ANALYTICS"
/// schema = "PIPELINES"
///
/// [dag]
/// name = "NIGHTLY"
/// schedule = "1d"
/// warehouse = "ETL_WH"
///
/// [task.extract]
/// sql = "call extract()"
///
/// [task.load]
/// procedure = "LOAD_PROC"
/// args = ["full"]
/// after = ["extract"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub target: TargetSection,
    pub dag: DagSection,
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated project file. Built through `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub target: TargetSection,
    pub dag: DagSection,
    /// Tasks keyed by their short name.
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    /// Assemble a config without validating it. Callers are expected to go
    /// through `TryFrom<RawConfigFile>` instead.
    pub(crate) fn new_unchecked(
        target: TargetSection,
        dag: DagSection,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self { target, dag, task }
    }
}

/// `[target]`: the namespace the graph is deployed into.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetSection {
    pub database: String,
    pub schema: String,
}

/// `[dag]`: graph name, schedule and settings shared by all tasks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DagSection {
    pub name: String,

    /// Interval with a unit suffix, e.g. `"30m"` or `"1d"`.
    #[serde(default)]
    pub schedule: Option<String>,

    #[serde(default)]
    pub cron: Option<CronConfig>,

    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub error_integration: Option<String>,
    #[serde(default)]
    pub allow_overlapping_execution: Option<bool>,
    #[serde(default)]
    pub user_task_timeout_ms: Option<u64>,
    #[serde(default)]
    pub suspend_task_after_num_failures: Option<u32>,
    #[serde(default)]
    pub task_auto_retry_attempts: Option<u32>,
    #[serde(default)]
    pub config: BTreeMap<String, toml::Value>,
    #[serde(default)]
    pub session_parameters: BTreeMap<String, toml::Value>,

    /// Defaults for `function`/`procedure` tasks.
    #[serde(default)]
    pub stage_location: Option<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub use_func_return_value: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CronConfig {
    pub expr: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// `[task.<name>]` section.
///
/// Exactly one of `sql`, `function`, `procedure` gives the task body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub sql: Option<String>,

    /// Handler function packaged and called by the backend.
    #[serde(default)]
    pub function: Option<String>,

    /// Registered stored procedure to call.
    #[serde(default)]
    pub procedure: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub stage_location: Option<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub packages: Vec<String>,

    /// The task returns the name of the successor that should run.
    #[serde(default)]
    pub branch: bool,

    /// Tasks that must complete before this one runs.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub finalizer: bool,

    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default)]
    pub serverless: bool,
    #[serde(default)]
    pub comment: Option<String>,

    /// Serverless only, e.g. `"30m"`.
    #[serde(default)]
    pub target_completion_interval: Option<String>,

    #[serde(default)]
    pub user_task_managed_initial_warehouse_size: Option<String>,
    #[serde(default)]
    pub serverless_task_min_statement_size: Option<String>,
    #[serde(default)]
    pub serverless_task_max_statement_size: Option<String>,
    #[serde(default)]
    pub user_task_timeout_ms: Option<u64>,
    #[serde(default)]
    pub session_parameters: BTreeMap<String, toml::Value>,
}

impl TaskConfig {
    /// Number of body fields (`sql`, `function`, `procedure`) that are set.
    pub fn body_count(&self) -> usize {
        [
            self.sql.is_some(),
            self.function.is_some(),
            self.procedure.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// The task body, if exactly one body field is set.
    pub fn definition(&self) -> Option<Definition> {
        if self.body_count() != 1 {
            return None;
        }
        if let Some(sql) = &self.sql {
            return Some(Definition::sql(sql.clone()));
        }

        let call = match (&self.function, &self.procedure) {
            (Some(handler), None) => ProcedureCall::function(handler.clone()),
            (None, Some(name)) => ProcedureCall::procedure(name.clone()),
            _ => return None,
        };
        let mut call = call
            .with_args(self.args.iter().cloned())
            .with_imports(self.imports.iter().cloned())
            .with_packages(self.packages.iter().cloned());
        call.stage_location = self.stage_location.clone();
        Some(call.into())
    }
}
