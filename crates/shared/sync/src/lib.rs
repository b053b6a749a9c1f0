//! Cadence Sync
//!
//! Signalling primitives shared by the single-writer service threads:
//!
//! - [`ErrorReporter`]: shared failure sink checked by every polling wait
//! - [`Pending`] / [`Resolver`]: one-shot reply cells resolved by a service
//!   thread, readable by bounded polling or `.await`
//! - [`power_nap`] / [`poll_until`]: explicit short-sleep polling with a
//!   tunable granularity

mod error;
mod pending;
mod reporter;

pub use error::{SyncError, SyncResult};
pub use pending::{Pending, PollSchedule, Resolver, pending, poll_until, power_nap};
pub use reporter::{ErrorReporter, ReportedError};
