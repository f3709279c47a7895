use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use courier_config::WorkflowDef;
use courier_executor::{ExecutionContext, ExecutorRegistry};
use courier_executor_http::DefaultExecutors;
use courier_task::Task;

/// Courier - validate and run workflow tasks with pluggable executors
#[derive(Parser)]
#[command(name = "courier")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the identity and input/output rules of registered executors
  Describe {
    /// Only describe this executor
    executor: Option<String>,
  },

  /// Validate a task's input without running it
  Validate {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// The task ID to validate
    #[arg(long)]
    task: String,
  },

  /// Validate and run a single task from a workflow
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// The task ID to execute
    #[arg(long)]
    task: String,
  },
}

fn main() -> Result<()> {
  init_tracing()?;

  let cli = Cli::parse();
  let registry =
    ExecutorRegistry::with_defaults().context("failed to register the default executors")?;

  match cli.command {
    Some(Commands::Describe { executor }) => describe(&registry, executor)?,
    Some(Commands::Validate {
      workflow_file,
      task,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(validate_task(&registry, workflow_file, task))?;
    }
    Some(Commands::Run {
      workflow_file,
      task,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_task(&registry, workflow_file, task))?;
    }
    None => {
      println!("courier - use --help to see available commands");
    }
  }

  Ok(())
}

const DEFAULT_LOG_FILTER: &str = "courier=info,courier_executor_http=info";

/// Logs go to stderr so stdout carries only JSON output.
fn init_tracing() -> Result<()> {
  let filter = match EnvFilter::try_from_default_env() {
    Ok(filter) => filter,
    Err(_) => EnvFilter::try_new(DEFAULT_LOG_FILTER).context("invalid default log filter")?,
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();

  Ok(())
}

fn describe(registry: &ExecutorRegistry, executor: Option<String>) -> Result<()> {
  let output = match executor {
    Some(id) => serde_json::to_value(registry.describe(&id)?)?,
    None => serde_json::to_value(registry.descriptors())?,
  };

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}

async fn load_task(workflow_file: &Path, task_id: &str) -> Result<(Task, Vec<Task>)> {
  let workflow = WorkflowDef::load(workflow_file)
    .await
    .with_context(|| format!("failed to load workflow file: {}", workflow_file.display()))?;

  info!(workflow = %workflow.name, tasks = workflow.tasks.len(), "loaded workflow");

  let task = workflow.task(task_id)?.clone();
  let siblings = workflow.siblings(task_id);
  Ok((task, siblings))
}

async fn validate_task(
  registry: &ExecutorRegistry,
  workflow_file: PathBuf,
  task_id: String,
) -> Result<()> {
  let (task, siblings) = load_task(&workflow_file, &task_id).await?;
  let ctx = ExecutionContext::new(uuid::Uuid::new_v4().to_string());

  let mut executor = registry
    .instantiate(&task.executor)
    .with_context(|| format!("task '{}' uses an unknown executor", task.id))?;
  executor
    .validate(&ctx, &task, &siblings)
    .with_context(|| format!("task '{}' is invalid", task.id))?;

  println!("task '{}' is valid", task.id);
  Ok(())
}

async fn run_task(registry: &ExecutorRegistry, workflow_file: PathBuf, task_id: String) -> Result<()> {
  let (task, siblings) = load_task(&workflow_file, &task_id).await?;

  let cancel = CancellationToken::new();
  let ctrl_c = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupted, cancelling task");
      ctrl_c.cancel();
    }
  });

  let ctx = ExecutionContext::new(uuid::Uuid::new_v4().to_string()).with_cancel(cancel);
  info!(execution_id = %ctx.execution_id, task_id = %task.id, "running task");

  let mut executor = registry
    .instantiate(&task.executor)
    .with_context(|| format!("task '{}' uses an unknown executor", task.id))?;

  executor
    .validate(&ctx, &task, &siblings)
    .with_context(|| format!("task '{}' is invalid", task.id))?;

  let output = executor
    .execute(&ctx, &task, &siblings)
    .await
    .with_context(|| format!("task '{}' failed", task.id))?;

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}
