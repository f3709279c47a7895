use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use courier_task::Task;

use crate::error::ExecutorError;
use crate::rules::RuleSet;

/// Per-invocation context passed by the orchestrator.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
  /// Workflow execution ID.
  pub execution_id: String,

  /// Cancels outbound work for this execution.
  pub cancel: CancellationToken,
}

impl ExecutionContext {
  pub fn new(execution_id: impl Into<String>) -> Self {
    Self {
      execution_id: execution_id.into(),
      cancel: CancellationToken::new(),
    }
  }

  pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
    self.cancel = cancel;
    self
  }
}

/// A pluggable handler for one kind of task.
///
/// Instances may cache state derived from the task they are validating, so a
/// fresh instance from [`Executor::new_instance`] must be used for every task
/// execution. Both `validate` and `execute` take `&mut self` for that reason.
#[async_trait]
pub trait Executor: Send + Sync {
  /// Unique identifier used by tasks to select this executor.
  fn id(&self) -> &'static str;

  fn name(&self) -> &'static str;

  fn description(&self) -> &'static str;

  fn input_rules(&self) -> &RuleSet;

  fn output_rules(&self) -> &RuleSet;

  /// Create a fresh instance with no cached task state.
  fn new_instance(&self) -> Box<dyn Executor>;

  /// Check the task's input without performing any external work.
  fn validate(
    &mut self,
    ctx: &ExecutionContext,
    task: &Task,
    siblings: &[Task],
  ) -> Result<(), ExecutorError>;

  /// Run the task, returning its output as a JSON value.
  async fn execute(
    &mut self,
    ctx: &ExecutionContext,
    task: &Task,
    siblings: &[Task],
  ) -> Result<serde_json::Value, ExecutorError>;
}
