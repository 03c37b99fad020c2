#![allow(dead_code)]

use std::collections::BTreeMap;

use taskdag::config::{
    ConfigFile, CronConfig, DagSection, RawConfigFile, TargetSection, TaskConfig,
};
use taskdag::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from target `DB.SCH` and an unscheduled graph.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(dag_name: &str) -> Self {
        Self {
            config: RawConfigFile {
                target: TargetSection {
                    database: "DB".to_string(),
                    schema: "SCH".to_string(),
                },
                dag: DagSection {
                    name: dag_name.to_string(),
                    ..DagSection::default()
                },
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn target(mut self, database: &str, schema: &str) -> Self {
        self.config.target.database = database.to_string();
        self.config.target.schema = schema.to_string();
        self
    }

    pub fn schedule(mut self, every: &str) -> Self {
        self.config.dag.schedule = Some(every.to_string());
        self
    }

    pub fn cron(mut self, expr: &str, timezone: &str) -> Self {
        self.config.dag.cron = Some(CronConfig {
            expr: expr.to_string(),
            timezone: timezone.to_string(),
        });
        self
    }

    pub fn warehouse(mut self, warehouse: &str) -> Self {
        self.config.dag.warehouse = Some(warehouse.to_string());
        self
    }

    pub fn stage_location(mut self, stage: &str) -> Self {
        self.config.dag.stage_location = Some(stage.to_string());
        self
    }

    pub fn use_func_return_value(mut self, val: bool) -> Self {
        self.config.dag.use_func_return_value = val;
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn sql(text: &str) -> Self {
        Self {
            task: TaskConfig {
                sql: Some(text.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    pub fn function(handler: &str) -> Self {
        Self {
            task: TaskConfig {
                function: Some(handler.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    pub fn procedure(name: &str) -> Self {
        Self {
            task: TaskConfig {
                procedure: Some(name.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.task.args.push(arg.to_string());
        self
    }

    pub fn branch(mut self) -> Self {
        self.task.branch = true;
        self
    }

    pub fn finalizer(mut self) -> Self {
        self.task.finalizer = true;
        self
    }

    pub fn condition(mut self, condition: &str) -> Self {
        self.task.condition = Some(condition.to_string());
        self
    }

    pub fn warehouse(mut self, warehouse: &str) -> Self {
        self.task.warehouse = Some(warehouse.to_string());
        self
    }

    pub fn serverless(mut self) -> Self {
        self.task.serverless = true;
        self
    }

    pub fn target_completion_interval(mut self, interval: &str) -> Self {
        self.task.target_completion_interval = Some(interval.to_string());
        self
    }

    pub fn also_sql(mut self, text: &str) -> Self {
        self.task.sql = Some(text.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
