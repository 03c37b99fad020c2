// src/dag/definition.rs

//! Work definitions carried by tasks.
//!
//! This layer treats the body as opaque: it is either literal SQL text or a
//! deferred call descriptor that the backend turns into a procedure call.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Definition {
    Sql(String),
    Call(ProcedureCall),
}

impl Definition {
    pub fn sql(text: impl Into<String>) -> Self {
        Definition::Sql(text.into())
    }

    /// Human-readable one-line rendering used by `plan` output and logs.
    pub fn summary(&self) -> String {
        match self {
            Definition::Sql(text) => text.clone(),
            Definition::Call(call) => call.summary(),
        }
    }
}

impl From<ProcedureCall> for Definition {
    fn from(call: ProcedureCall) -> Self {
        Definition::Call(call)
    }
}

/// What a [`ProcedureCall`] invokes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallTarget {
    /// A handler function that the backend packages as an anonymous
    /// procedure. Needs a stage location for its code.
    Function(String),
    /// An existing, permanently registered stored procedure.
    Procedure(String),
}

/// Deferred call descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureCall {
    pub target: CallTarget,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub input_types: Vec<String>,
    #[serde(default)]
    pub stage_location: Option<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub packages: Vec<String>,
    /// Publish the handler's return value as the task return value, so that
    /// branch successors can read it.
    #[serde(default)]
    pub use_return_value: bool,
}

impl ProcedureCall {
    pub fn function(handler: impl Into<String>) -> Self {
        Self::new(CallTarget::Function(handler.into()))
    }

    pub fn procedure(name: impl Into<String>) -> Self {
        Self::new(CallTarget::Procedure(name.into()))
    }

    fn new(target: CallTarget) -> Self {
        Self {
            target,
            args: Vec::new(),
            return_type: None,
            input_types: Vec::new(),
            stage_location: None,
            imports: Vec::new(),
            packages: Vec::new(),
            use_return_value: false,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stage_location(mut self, stage: impl Into<String>) -> Self {
        self.stage_location = Some(stage.into());
        self
    }

    pub fn with_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages = packages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports = imports.into_iter().map(Into::into).collect();
        self
    }

    /// Name of the handler or procedure. A call wrapped implicitly into a
    /// task uses this as the task name.
    pub fn name(&self) -> &str {
        match &self.target {
            CallTarget::Function(name) | CallTarget::Procedure(name) => name,
        }
    }

    /// Anonymous function calls must ship code to a stage.
    pub fn needs_stage(&self) -> bool {
        matches!(self.target, CallTarget::Function(_))
    }

    pub fn summary(&self) -> String {
        match &self.target {
            CallTarget::Function(handler) => format!("<function {handler}>"),
            CallTarget::Procedure(name) => {
                let args = self
                    .args
                    .iter()
                    .map(|a| format!("'{}'", a.replace('\'', "''")))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("CALL {name}({args})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procedure_summary_quotes_arguments() {
        let call = ProcedureCall::procedure("LOAD").with_args(["full", "it's"]);
        assert_eq!(call.summary(), "CALL LOAD('full', 'it''s')");
        assert!(!call.needs_stage());
    }

    #[test]
    fn function_call_is_named_after_its_handler() {
        let call = ProcedureCall::function("route_handler");
        assert_eq!(call.name(), "route_handler");
        assert!(call.needs_stage());
        assert_eq!(Definition::from(call).summary(), "<function route_handler>");
    }
}
