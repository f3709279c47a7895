//! Courier HTTP Executor
//!
//! Runs tasks whose input describes a single HTTP request.
//!
//! # Flow
//! 1. Coerce the task's opaque input into [`HttpInput`] (cached per instance)
//! 2. Expand `{{ ... }}` templates against sibling tasks, only when present
//! 3. Build the request: `POST`, `PUT` and `PATCH` carry the body
//! 4. Send it and read the whole response into an [`HttpOutput`]

mod executor;
mod input;
mod output;
mod registry;

pub use executor::{HttpExecutor, build_request, encode_body};
pub use input::{HttpInput, HttpMethod, check, coerce, expand_input, needs_expansion};
pub use output::{HttpOutput, normalize_headers};
pub use registry::DefaultExecutors;
