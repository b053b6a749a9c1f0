//! Cadence Core Domain
//!
//! Pure domain types for the Cadence benchmark driver.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{Operation, OperationResult};
pub use values::{OperationId, PeerId, Time, as_milli, duration_from_milli};
