// src/config/mod.rs

//! Project file loading and validation for taskdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a project file from disk (`loader.rs`).
//! - Validate it before use (`validate.rs`).
//! - Turn it into a [`Graph`](crate::dag::Graph) (`convert.rs`).

pub mod convert;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, default_state_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, CronConfig, DagSection, RawConfigFile, TargetSection, TaskConfig};
