use cadence_core::Time;
use cadence_ports::Clock;
use chrono::Utc;

/// Real system clock for benchmark runs
///
/// This simply returns the current wall-clock time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Time {
        // Pre-epoch wall clocks are clamped to the epoch
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or(0);
        Time::from_nano(u64::try_from(nanos).unwrap_or(0))
    }

    fn name(&self) -> &str {
        "SystemClock"
    }
}
