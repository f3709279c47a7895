//! Courier Template
//!
//! Expands `{{ ... }}` placeholders in a task's serialized input using data
//! from the task itself and its sibling tasks.
//!
//! # Context
//! Sibling tasks are keyed by their ID, and the task being executed is
//! available as `task`:
//! ```json
//! {
//!   "url": "https://api.example.com/users/{{ fetch_user.output.id }}",
//!   "headers": { "X-Request-From": "{{ task.id }}" }
//! }
//! ```
//!
//! Substituted values are inserted as raw text. Callers that render JSON are
//! responsible for re-parsing the result.
//!
//! Only `{{ ... }}` is interpreted. Block and comment tags are moved to
//! delimiters built from a control character, which serialized JSON always
//! escapes, so a literal `{%` or `{#` in the input passes through as text.

mod error;

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, UndefinedBehavior, Value};

use courier_task::Task;

pub use error::TemplateError;

/// Marker that opens a template expression.
pub const TEMPLATE_OPEN: &str = "{{";

/// Marker that closes a template expression.
pub const TEMPLATE_CLOSE: &str = "}}";

const BLOCK_DELIMITERS: (&str, &str) = ("\u{1}%", "%\u{1}");
const COMMENT_DELIMITERS: (&str, &str) = ("\u{1}#", "#\u{1}");

/// Renders template text against a task and its siblings.
pub trait TemplateRenderer: Send + Sync {
  fn render(&self, template: &str, task: &Task, siblings: &[Task]) -> Result<String, TemplateError>;
}

/// Renderer backed by minijinja.
///
/// Undefined references are errors rather than empty strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct JinjaRenderer;

impl JinjaRenderer {
  pub fn new() -> Self {
    Self
  }

  fn environment(&self) -> Result<Environment<'static>, TemplateError> {
    let mut env = Environment::new();
    env.set_syntax(placeholder_syntax()?);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    Ok(env)
  }
}

impl TemplateRenderer for JinjaRenderer {
  fn render(&self, template: &str, task: &Task, siblings: &[Task]) -> Result<String, TemplateError> {
    let context = build_context(task, siblings)?;
    let env = self.environment()?;
    Ok(env.render_str(template, Value::from_serialize(&context))?)
  }
}

/// Syntax where `{{ }}` is the only delimiter that can appear in JSON text.
fn placeholder_syntax() -> Result<SyntaxConfig, TemplateError> {
  let (block_start, block_end) = BLOCK_DELIMITERS;
  let (comment_start, comment_end) = COMMENT_DELIMITERS;

  Ok(
    SyntaxConfig::builder()
      .block_delimiters(block_start, block_end)
      .variable_delimiters(TEMPLATE_OPEN, TEMPLATE_CLOSE)
      .comment_delimiters(comment_start, comment_end)
      .build()?,
  )
}

/// Build the render context: siblings keyed by ID, the current task as `task`.
pub fn build_context(task: &Task, siblings: &[Task]) -> Result<serde_json::Value, TemplateError> {
  let mut ctx = serde_json::Map::new();

  for sibling in siblings {
    ctx.insert(sibling.id.clone(), task_value(sibling)?);
  }

  // The current task wins over a sibling that happens to be named "task".
  ctx.insert("task".to_string(), task_value(task)?);

  Ok(serde_json::Value::Object(ctx))
}

fn task_value(task: &Task) -> Result<serde_json::Value, TemplateError> {
  serde_json::to_value(task).map_err(|source| TemplateError::Context {
    task_id: task.id.clone(),
    source,
  })
}
