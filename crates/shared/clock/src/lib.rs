//! Cadence Clock Infrastructure
//!
//! Provides time sources for benchmark runs and tests:
//!
//! - [`SystemClock`]: wall-clock time, used for real runs
//! - [`WorldClock`]: controllable time with a [`TimeScale`], used to make
//!   spinner and metrics tests deterministic
//!
//! ## Usage
//!
//! ```ignore
//! use cadence_clock::{WorldClock, TimeScale};
//! use cadence_core::Time;
//! use std::time::Duration;
//!
//! let world = WorldClock::fixed(Time::from_seconds(0));
//! world.advance(Duration::from_millis(250));     // Jump forward
//! world.set_time_scale(TimeScale::Fast(100));    // 100x speed
//! ```

mod system;
mod world;

pub use system::SystemClock;
pub use world::{TimeScale, WorldClock};

// Re-export the Clock trait for convenience
pub use cadence_ports::Clock;
