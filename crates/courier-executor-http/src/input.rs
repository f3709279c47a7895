//! HTTP task input: coercion, validation rules and template expansion.
//!
//! # Example
//! ```json
//! {
//!   "url": "http://localhost:8080/users",
//!   "method": "POST",
//!   "headers": { "Content-Type": "application/json" },
//!   "body": { "name": "John Doe", "age": 25 }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::{Validate, ValidationError};

use courier_executor::{ExecutorError, RuleSet, Schema};
use courier_task::Task;
use courier_template::{TEMPLATE_OPEN, TemplateRenderer};

/// Methods accepted by the HTTP executor. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
  Get,
  Post,
  Put,
  Delete,
  Patch,
  Options,
  Head,
}

impl HttpMethod {
  pub const ALL: [HttpMethod; 7] = [
    HttpMethod::Get,
    HttpMethod::Post,
    HttpMethod::Put,
    HttpMethod::Delete,
    HttpMethod::Patch,
    HttpMethod::Options,
    HttpMethod::Head,
  ];

  pub fn parse(method: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|m| m.as_str() == method)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      HttpMethod::Get => "GET",
      HttpMethod::Post => "POST",
      HttpMethod::Put => "PUT",
      HttpMethod::Delete => "DELETE",
      HttpMethod::Patch => "PATCH",
      HttpMethod::Options => "OPTIONS",
      HttpMethod::Head => "HEAD",
    }
  }

  /// Whether requests with this method carry the task's body.
  pub fn carries_body(&self) -> bool {
    matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
  }
}

impl fmt::Display for HttpMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl From<HttpMethod> for reqwest::Method {
  fn from(method: HttpMethod) -> Self {
    match method {
      HttpMethod::Get => reqwest::Method::GET,
      HttpMethod::Post => reqwest::Method::POST,
      HttpMethod::Put => reqwest::Method::PUT,
      HttpMethod::Delete => reqwest::Method::DELETE,
      HttpMethod::Patch => reqwest::Method::PATCH,
      HttpMethod::Options => reqwest::Method::OPTIONS,
      HttpMethod::Head => reqwest::Method::HEAD,
    }
  }
}

/// Input of an HTTP task.
///
/// Fields not listed here are rejected during coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct HttpInput {
  #[validate(length(min = 1), url)]
  pub url: String,

  #[validate(custom = "validate_method")]
  pub method: String,

  /// Required, may be empty.
  pub headers: HashMap<String, String>,

  /// Sent verbatim when it is a string, JSON-encoded otherwise.
  #[serde(default)]
  pub body: Option<serde_json::Value>,
}

/// Introspection view of the `#[validate]` attributes above. The method list
/// comes from [`HttpMethod::ALL`], the same list `validate_method` accepts.
impl Schema for HttpInput {
  fn rules() -> RuleSet {
    RuleSet::new()
      .field("url", "required,url")
      .field("method", format!("required,in({})", method_names().join("|")))
      .field("headers", "required,dictionary")
      .field("body", "")
  }
}

fn method_names() -> Vec<&'static str> {
  HttpMethod::ALL.iter().map(HttpMethod::as_str).collect()
}

fn validate_method(method: &str) -> Result<(), ValidationError> {
  if HttpMethod::parse(method).is_some() {
    return Ok(());
  }

  let mut error = ValidationError::new("method");
  error.message = Some(format!("unsupported http method '{}'", method).into());
  Err(error)
}

/// Coerce the orchestrator's opaque input into an [`HttpInput`].
pub fn coerce(raw: Option<&serde_json::Value>) -> Result<HttpInput, ExecutorError> {
  let raw = match raw {
    None | Some(serde_json::Value::Null) => {
      return Err(ExecutorError::invalid_input("input is required"));
    }
    Some(raw) => raw,
  };

  if !raw.is_object() {
    return Err(ExecutorError::invalid_input("input must be an object"));
  }

  serde_json::from_value(raw.clone())
    .map_err(|e| ExecutorError::invalid_input(format!("input has the wrong shape: {}", e)))
}

/// Run the structural rules against a coerced input.
pub fn check(input: &HttpInput) -> Result<(), ExecutorError> {
  input
    .validate()
    .map_err(|e| ExecutorError::invalid_input(format!("input validation failed: {}", e)))
}

/// Whether serialized input contains a template expression.
pub fn needs_expansion(serialized: &str) -> bool {
  serialized.contains(TEMPLATE_OPEN)
}

/// Expand templated values in the input.
///
/// The renderer is only called when the serialized input contains a template
/// marker; otherwise the input is returned unchanged.
pub fn expand_input(
  renderer: &dyn TemplateRenderer,
  input: &HttpInput,
  task: &Task,
  siblings: &[Task],
) -> Result<HttpInput, ExecutorError> {
  let serialized =
    serde_json::to_string(input).map_err(|source| ExecutorError::InputEncode { source })?;

  if !needs_expansion(&serialized) {
    debug!("input has no template markers");
    return Ok(input.clone());
  }

  debug!(siblings = siblings.len(), "rendering templated input");
  let rendered = renderer
    .render(&serialized, task, siblings)
    .map_err(|source| ExecutorError::TemplateRender { source })?;

  serde_json::from_str(&rendered).map_err(|source| ExecutorError::InputDecode { source })
}
