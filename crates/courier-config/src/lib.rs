//! Courier Config
//!
//! Serializable workflow definitions: a named list of tasks. Tasks may carry
//! an `output` recorded from an earlier run, which later tasks reference from
//! their templated inputs.
//!
//! ```json
//! {
//!   "name": "user-sync",
//!   "tasks": [
//!     { "id": "auth", "executor": "http", "output": { "token": "abc" } },
//!     {
//!       "id": "fetch_user",
//!       "executor": "http",
//!       "input": {
//!         "url": "https://api.example.com/me",
//!         "method": "GET",
//!         "headers": { "Authorization": "Bearer {{ auth.output.token }}" }
//!       }
//!     }
//!   ]
//! }
//! ```

mod error;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use courier_task::Task;

pub use error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default)]
  pub tasks: Vec<Task>,
}

impl WorkflowDef {
  /// Parse a workflow from JSON text. Task IDs must be unique.
  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    let workflow: WorkflowDef = serde_json::from_str(content)?;

    let mut seen = HashSet::new();
    for task in &workflow.tasks {
      if !seen.insert(task.id.as_str()) {
        return Err(ConfigError::DuplicateTask(task.id.clone()));
      }
    }

    Ok(workflow)
  }

  /// Read and parse a workflow file.
  pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
      .await
      .map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
      })?;
    Self::from_json(&content)
  }

  pub fn task(&self, id: &str) -> Result<&Task, ConfigError> {
    self
      .tasks
      .iter()
      .find(|t| t.id == id)
      .ok_or_else(|| ConfigError::TaskNotFound(id.to_string()))
  }

  /// Every task other than `id`, in declaration order.
  pub fn siblings(&self, id: &str) -> Vec<Task> {
    self.tasks.iter().filter(|t| t.id != id).cloned().collect()
  }
}
