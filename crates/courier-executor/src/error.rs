use courier_template::TemplateError;
use thiserror::Error;

/// Boxed error from a lower layer (transport, body stream).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Broad category of an [`ExecutorError`].
///
/// Orchestrators branch on this, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Task input is missing, mistyped, or violates the executor's rules.
  InvalidInput,
  /// A templated reference could not be resolved.
  TemplateExpansion,
  /// The resolved input could not be turned into an outbound request.
  RequestConstruction,
  /// The outbound call did not complete.
  Transport,
  /// The response arrived but its body could not be read.
  ResponseRead,
  /// The execution context was cancelled.
  Cancelled,
  /// Encoding the executor's own data failed.
  Internal,
}

/// Errors that can occur while validating or executing a task.
#[derive(Debug, Error)]
pub enum ExecutorError {
  #[error("invalid input: {message}")]
  InvalidInput { message: String },

  #[error("failed to marshal the input: {source}")]
  InputEncode {
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to render the input template: {source}")]
  TemplateRender {
    #[source]
    source: TemplateError,
  },

  #[error("failed to unmarshal the input: {source}")]
  InputDecode {
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to create the http request: {message}")]
  RequestBuild { message: String },

  #[error("failed to send the http request: {source}")]
  Transport {
    #[source]
    source: BoxError,
  },

  #[error("failed to read the response body: {source}")]
  ResponseRead {
    #[source]
    source: BoxError,
  },

  #[error("failed to marshal the output: {source}")]
  OutputEncode {
    #[source]
    source: serde_json::Error,
  },

  #[error("execution cancelled")]
  Cancelled,
}

impl ExecutorError {
  pub fn invalid_input(message: impl Into<String>) -> Self {
    Self::InvalidInput {
      message: message.into(),
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidInput { .. } => ErrorKind::InvalidInput,
      Self::TemplateRender { .. } | Self::InputDecode { .. } => ErrorKind::TemplateExpansion,
      Self::RequestBuild { .. } => ErrorKind::RequestConstruction,
      Self::Transport { .. } => ErrorKind::Transport,
      Self::ResponseRead { .. } => ErrorKind::ResponseRead,
      Self::Cancelled => ErrorKind::Cancelled,
      Self::InputEncode { .. } | Self::OutputEncode { .. } => ErrorKind::Internal,
    }
  }

  /// Whether a workflow-level retry policy may retry this failure.
  ///
  /// Only failures outside the task definition qualify.
  pub fn is_retryable(&self) -> bool {
    matches!(self.kind(), ErrorKind::Transport | ErrorKind::ResponseRead)
  }
}
