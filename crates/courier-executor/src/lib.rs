//! Courier Executor
//!
//! The contract between the orchestrator and pluggable task executors.
//!
//! An [`Executor`] exposes static identity and rule-set metadata, validates a
//! task's input without side effects, and executes the task to produce an
//! output value. The [`ExecutorRegistry`] keeps one prototype per executor ID
//! and hands out a fresh instance for every task execution.

mod error;
mod executor;
mod registry;
mod rules;

pub use error::{BoxError, ErrorKind, ExecutorError};
pub use executor::{ExecutionContext, Executor};
pub use registry::{ExecutorDescriptor, ExecutorRegistry, RegistryError};
pub use rules::{RuleSet, Schema};
