use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const NANOS_PER_MILLI: u64 = 1_000_000;

/// A point in time, stored as nanoseconds since the Unix epoch.
///
/// Millisecond views are provided because schedules and result logs are
/// expressed in milliseconds, while the spinner and the completion-time
/// bookkeeping work at nanosecond resolution.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time {
    nanos: u64,
}

impl Time {
    pub const MIN: Self = Self { nanos: u64::MIN };
    pub const MAX: Self = Self { nanos: u64::MAX };

    pub const fn from_nano(nanos: u64) -> Self {
        Self { nanos }
    }

    pub const fn from_milli(millis: u64) -> Self {
        Self {
            nanos: millis.saturating_mul(NANOS_PER_MILLI),
        }
    }

    pub const fn from_seconds(seconds: u64) -> Self {
        Self::from_milli(seconds.saturating_mul(1_000))
    }

    pub const fn as_nano(&self) -> u64 {
        self.nanos
    }

    pub const fn as_milli(&self) -> u64 {
        self.nanos / NANOS_PER_MILLI
    }

    /// Later point in time; saturates at [`Time::MAX`].
    pub fn plus(self, duration: Duration) -> Self {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        Self {
            nanos: self.nanos.saturating_add(nanos),
        }
    }

    /// Earlier point in time; saturates at [`Time::MIN`].
    pub fn minus(self, duration: Duration) -> Self {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        Self {
            nanos: self.nanos.saturating_sub(nanos),
        }
    }

    /// Span from `earlier` to `self`, zero if `earlier` is later.
    pub fn duration_since(self, earlier: Time) -> Duration {
        Duration::from_nanos(self.nanos.saturating_sub(earlier.nanos))
    }

    /// The immediately preceding representable instant. `None` only for
    /// [`Time::MIN`].
    pub fn step_back(self) -> Option<Self> {
        self.nanos.checked_sub(1).map(|nanos| Self { nanos })
    }
}

impl From<u64> for Time {
    fn from(nanos: u64) -> Self {
        Self { nanos }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.as_milli();
        let sub_milli = self.nanos % NANOS_PER_MILLI;
        if sub_milli == 0 {
            write!(f, "{millis}ms")
        } else {
            write!(f, "{millis}.{sub_milli:06}ms")
        }
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Build a [`Duration`] from whole milliseconds
pub fn duration_from_milli(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Whole milliseconds of a [`Duration`], saturating at `u64::MAX`
pub fn as_milli(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
