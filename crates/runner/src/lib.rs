//! Cadence Runner - Benchmark Driver
//!
//! Turns a stream of scheduled operations into executed, measured work:
//!
//! - **Config**: JSON driver configuration with defaults for every field
//! - **Stream**: delimited rows decoded into operations by key
//! - **Database**: operation bodies over the [`cadence_ports::Database`] port
//! - **Driver**: the run loop tying the services together
//!
//! ## Architecture
//!
//! ```text
//!   operations (scheduled start order)
//!        │
//!        ▼
//! ┌──────────────┐  initiated    ┌───────────────────────────┐
//! │    Driver    │──────────────▶│  Completion Time Service  │◀── peers
//! └──────┬───────┘               └─────────────┬─────────────┘
//!        │ handlers                            │ GCT
//!        ▼                                     ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │ Handler Executor: spinner wait → body → completed        │
//! └──────────────────────────────┬───────────────────────────┘
//!                                │ results
//!                                ▼
//!                      ┌───────────────────┐
//!                      │  Metrics Service  │──▶ results log / JSON
//!                      └───────────────────┘
//! ```

pub mod config;
pub mod database;
pub mod driver;
pub mod error;
pub mod stream;

// Re-export main types
pub use config::{DelayPolicyKind, DriverConfig};
pub use database::{DATABASE_OPERATION_KINDS, DatabaseExecutor, MemoryDatabase};
pub use driver::{Driver, DriverReport};
pub use error::{ConfigError, DecodingError, DriverError, Result};
pub use stream::{CsvEventStreamReader, EventDecoder, Row, csv_rows, operation_decoder, operation_stream};
