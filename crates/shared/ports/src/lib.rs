//! Cadence Ports
//!
//! Port definitions (traits) for the Cadence benchmark driver.
//! These define the boundaries between the coordination services and
//! whatever supplies time, operation bodies, or a system under test.

mod clock;
mod completion;
mod database;
mod delay;
mod error;

pub use clock::Clock;
pub use completion::{CompletionTimeWriter, GlobalCompletionTimeReader};
pub use database::{Database, Record};
pub use delay::ExecutionDelayPolicy;
pub use error::{CompletionTimeError, CompletionTimeResult, DbError, DbResult};
