//! Courier Task
//!
//! The unit of work an orchestrator hands to an executor. Executors never
//! mutate a task: they read its `input`, and the orchestrator records the
//! executor's result in `output` once the run completes so that later tasks
//! can reference it from their own templated inputs.

use serde::{Deserialize, Serialize};

/// A task as defined in a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
  /// Unique task ID within the workflow.
  pub id: String,

  /// Optional human-readable name.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  /// Identifier of the executor that runs this task, e.g. "http".
  pub executor: String,

  /// Opaque input, coerced by the executor into its own input shape.
  #[serde(default)]
  pub input: Option<serde_json::Value>,

  /// Output recorded by the orchestrator after a previous run.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<serde_json::Value>,
}

impl Task {
  /// Create a task with no input and no recorded output.
  pub fn new(id: impl Into<String>, executor: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      name: None,
      executor: executor.into(),
      input: None,
      output: None,
    }
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  pub fn with_input(mut self, input: serde_json::Value) -> Self {
    self.input = Some(input);
    self
  }

  pub fn with_output(mut self, output: serde_json::Value) -> Self {
    self.output = Some(output);
    self
  }
}
