//! Template error types.

/// Errors that can occur while rendering a templated input.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
  /// A task could not be turned into template context.
  #[error("failed to build template context for task '{task_id}': {source}")]
  Context {
    task_id: String,
    #[source]
    source: serde_json::Error,
  },

  /// Rendering failed: syntax error or unresolved reference.
  #[error("failed to render template: {0}")]
  Render(#[from] minijinja::Error),
}
