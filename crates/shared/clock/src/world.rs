use cadence_core::Time;
use cadence_ports::Clock;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::SystemClock;

/// Time scale modes for driver tests
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TimeScale {
    /// Real-time (1:1 ratio with wall clock)
    #[default]
    Normal,
    /// Accelerated time (multiplier applied to elapsed time)
    Fast(u32),
    /// Decelerated time (divisor applied to elapsed time)
    Slow(u32),
    /// Fixed time (only advances when explicitly moved)
    Fixed,
}

struct Anchor {
    scale: TimeScale,
    real: Instant,
    sim: Time,
}

/// Controllable clock - the source of truth for all time in a test run
///
/// Elapsed real time is measured from the last anchor point and scaled
/// according to the current [`TimeScale`]. Changing the scale re-anchors
/// so simulated time stays continuous.
pub struct WorldClock {
    anchor: RwLock<Anchor>,
}

impl WorldClock {
    /// Create a new world clock
    ///
    /// # Arguments
    /// * `initial_time` - Optional starting time. If None, uses current wall time.
    pub fn new(initial_time: Option<Time>) -> Arc<Self> {
        let sim = initial_time.unwrap_or_else(|| SystemClock::new().now());
        Arc::new(Self {
            anchor: RwLock::new(Anchor {
                scale: TimeScale::Normal,
                real: Instant::now(),
                sim,
            }),
        })
    }

    /// Create a clock frozen at `time`
    pub fn fixed(time: Time) -> Arc<Self> {
        let clock = Self::new(Some(time));
        clock.set_time_scale(TimeScale::Fixed);
        clock
    }

    /// Set the time scale
    pub fn set_time_scale(&self, scale: TimeScale) {
        let mut anchor = self.anchor.write();
        let now = Self::scaled_now(&anchor);
        anchor.sim = now;
        anchor.real = Instant::now();
        anchor.scale = scale;
    }

    /// Get the current time scale
    pub fn time_scale(&self) -> TimeScale {
        self.anchor.read().scale
    }

    /// Advance the simulated time by a specified duration
    ///
    /// This is primarily useful in Fixed mode for deterministic testing.
    /// In other modes, it shifts the base time.
    pub fn advance(&self, duration: Duration) {
        let mut anchor = self.anchor.write();
        anchor.sim = anchor.sim.plus(duration);
    }

    /// Explicitly set the simulated time
    ///
    /// Warning: This can cause time discontinuities. Use with caution.
    pub fn set_time(&self, time: Time) {
        let mut anchor = self.anchor.write();
        anchor.sim = time;
        anchor.real = Instant::now();
    }

    fn scaled_now(anchor: &Anchor) -> Time {
        let real_elapsed = anchor.real.elapsed();
        match anchor.scale {
            TimeScale::Normal => anchor.sim.plus(real_elapsed),
            TimeScale::Fast(multiplier) => anchor.sim.plus(real_elapsed.saturating_mul(multiplier)),
            TimeScale::Slow(0) => anchor.sim,
            TimeScale::Slow(divisor) => anchor.sim.plus(real_elapsed / divisor),
            TimeScale::Fixed => anchor.sim,
        }
    }
}

impl Clock for WorldClock {
    fn now(&self) -> Time {
        Self::scaled_now(&self.anchor.read())
    }

    fn name(&self) -> &str {
        "WorldClock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_world_clock_creation() {
        let clock = WorldClock::new(None);
        let time1 = clock.now();
        let time2 = clock.now();
        assert!(time2 >= time1);
    }

    #[test]
    fn test_fixed_mode() {
        let clock = WorldClock::fixed(Time::from_seconds(100));

        let time1 = clock.now();
        thread::sleep(Duration::from_millis(10));
        let time2 = clock.now();

        // In fixed mode, time should not advance automatically
        assert_eq!(time1, time2);

        // Advance manually
        clock.advance(Duration::from_secs(5));
        let time3 = clock.now();
        assert_eq!(time3.duration_since(time1), Duration::from_secs(5));
    }

    #[test]
    fn test_fast_mode_outpaces_wall_clock() {
        let clock = WorldClock::new(Some(Time::from_seconds(1)));
        clock.set_time_scale(TimeScale::Fast(100));

        let start = clock.now();
        thread::sleep(Duration::from_millis(20));
        let elapsed = clock.now().duration_since(start);

        assert!(elapsed >= Duration::from_millis(1_000));
    }

    #[test]
    fn test_scale_change_keeps_time_continuous() {
        let clock = WorldClock::fixed(Time::from_seconds(10));
        clock.set_time_scale(TimeScale::Normal);
        assert!(clock.now() >= Time::from_seconds(10));
        assert!(clock.now() < Time::from_seconds(11));
    }
}
