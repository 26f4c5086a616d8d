//! Subprocess execution primitives for the command pipeline:
//! argv/env/stdin composition, launch with timeout + grace-period
//! termination, and response formatting.

pub mod error;
pub mod execute;
pub mod format;
pub mod invocation;

pub use error::CommandError;
pub use execute::{run, ExecutionOutcome, ExecutionStatus};
pub use format::format_outcome;
pub use invocation::{compose, ComposedInvocation};
