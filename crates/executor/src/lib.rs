//! Cadence Executor
//!
//! Operation scheduling and execution:
//!
//! - [`Spinner`]: polls until an operation's scheduled start (and its
//!   completion time dependency) is reached
//! - delay policies deciding what happens to operations that start late
//! - [`OperationHandler`]: runs one operation and reports its initiated and
//!   completed times
//! - [`HandlerExecutor`]: bounded handler pool with a completion-ordered
//!   result stream
//!
//! ```text
//! Scheduled ──▶ Waiting (spinner) ──▶ Executing ──▶ Completed
//!                   │                     ├──────▶ Failed
//!                   └─────────────────────┴──────▶ Interrupted
//! ```

mod error;
mod handler;
mod policy;
mod pool;
mod spinner;

pub use error::{ExecutionError, ExecutionFailure, Result};
pub use handler::{OperationExecutor, OperationHandler, OperationOutcome};
pub use policy::{LoggingDelayPolicy, PermissiveDelayPolicy, StrictDelayPolicy};
pub use pool::HandlerExecutor;
pub use spinner::{Release, Spinner, SpinnerConfig};
