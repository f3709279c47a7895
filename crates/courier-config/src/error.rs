use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read workflow file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse workflow: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("duplicate task id: {0}")]
  DuplicateTask(String),

  #[error("task not found: {0}")]
  TaskNotFound(String),
}
