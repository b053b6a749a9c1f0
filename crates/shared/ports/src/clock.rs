use cadence_core::Time;

/// Port for time abstraction
///
/// This allows the driver to use different time sources:
/// - Real system time for benchmark runs
/// - Scaled or fixed time for deterministic tests
pub trait Clock: Send + Sync {
    /// Get the current time according to this clock
    fn now(&self) -> Time;

    /// Get the clock's name/identifier for debugging
    fn name(&self) -> &str {
        "Clock"
    }
}
