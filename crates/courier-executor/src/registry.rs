use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::executor::Executor;
use crate::rules::RuleSet;

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("executor '{0}' is already registered")]
  Duplicate(String),

  #[error("executor not found: {0}")]
  NotFound(String),
}

/// Static description of a registered executor.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutorDescriptor {
  pub id: String,
  pub name: String,
  pub description: String,
  pub input_rules: RuleSet,
  pub output_rules: RuleSet,
}

impl ExecutorDescriptor {
  fn of(executor: &dyn Executor) -> Self {
    Self {
      id: executor.id().to_string(),
      name: executor.name().to_string(),
      description: executor.description().to_string(),
      input_rules: executor.input_rules().clone(),
      output_rules: executor.output_rules().clone(),
    }
  }
}

/// Registry of executor prototypes keyed by executor ID.
///
/// The registered instance is never run itself; every lookup hands out a
/// fresh instance created from it.
#[derive(Default)]
pub struct ExecutorRegistry {
  prototypes: HashMap<&'static str, Box<dyn Executor>>,
}

impl ExecutorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register<E>(&mut self, executor: E) -> Result<(), RegistryError>
  where
    E: Executor + 'static,
  {
    let id = executor.id();
    if self.prototypes.contains_key(id) {
      return Err(RegistryError::Duplicate(id.to_string()));
    }
    self.prototypes.insert(id, Box::new(executor));
    Ok(())
  }

  pub fn contains(&self, id: &str) -> bool {
    self.prototypes.contains_key(id)
  }

  /// Create a fresh executor instance for a single task execution.
  pub fn instantiate(&self, id: &str) -> Result<Box<dyn Executor>, RegistryError> {
    self
      .prototypes
      .get(id)
      .map(|prototype| prototype.new_instance())
      .ok_or_else(|| RegistryError::NotFound(id.to_string()))
  }

  pub fn describe(&self, id: &str) -> Result<ExecutorDescriptor, RegistryError> {
    self
      .prototypes
      .get(id)
      .map(|prototype| ExecutorDescriptor::of(prototype.as_ref()))
      .ok_or_else(|| RegistryError::NotFound(id.to_string()))
  }

  /// Descriptors of all registered executors, sorted by ID.
  pub fn descriptors(&self) -> Vec<ExecutorDescriptor> {
    let mut descriptors: Vec<_> = self
      .prototypes
      .values()
      .map(|prototype| ExecutorDescriptor::of(prototype.as_ref()))
      .collect();
    descriptors.sort_by(|a, b| a.id.cmp(&b.id));
    descriptors
  }
}
