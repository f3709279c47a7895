use courier_executor::{ExecutorRegistry, RegistryError};

use crate::executor::HttpExecutor;

/// Builds a registry preloaded with the executors this crate provides.
pub trait DefaultExecutors: Sized {
  fn with_defaults() -> Result<Self, RegistryError>;
}

impl DefaultExecutors for ExecutorRegistry {
  fn with_defaults() -> Result<Self, RegistryError> {
    let mut registry = ExecutorRegistry::new();
    registry.register(HttpExecutor::new())?;
    Ok(registry)
  }
}
