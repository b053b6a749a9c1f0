use cadence_core::{Operation, Time};
use cadence_ports::{Clock, ExecutionDelayPolicy, GlobalCompletionTimeReader};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ExecutionError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinnerConfig {
    /// Nap between checks. Shorter naps start operations closer to their
    /// scheduled time at the cost of more wake-ups; zero only yields.
    pub sleep_duration: Duration,
}

impl Default for SpinnerConfig {
    fn default() -> Self {
        Self {
            sleep_duration: Duration::from_millis(1),
        }
    }
}

/// How the spinner let an operation go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub at: Time,
    /// Released past its tolerated delay and accepted by the delay policy
    pub late_start_accepted: bool,
}

/// Execution gate shared by every handler
///
/// Polls the clock (and the global completion time for operations with a
/// dependency) instead of arming a timer, so operations start as close to
/// their scheduled time as the nap granularity allows.
pub struct Spinner {
    clock: Arc<dyn Clock>,
    delay_policy: Arc<dyn ExecutionDelayPolicy>,
    config: SpinnerConfig,
}

impl Spinner {
    pub fn new(
        clock: Arc<dyn Clock>,
        delay_policy: Arc<dyn ExecutionDelayPolicy>,
        config: SpinnerConfig,
    ) -> Self {
        Self {
            clock,
            delay_policy,
            config,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Wait until `operation` may start.
    ///
    /// The delay policy is asked at most once, when the operation is
    /// released later than its tolerated delay. A refusal fails with
    /// [`ExecutionError::ExcessiveDelay`].
    pub async fn wait_for_start(
        &self,
        operation: &Operation,
        gct: &dyn GlobalCompletionTimeReader,
    ) -> Result<Release> {
        let at = loop {
            let now = self.clock.now();
            if now >= operation.scheduled_start && dependency_met(operation, gct) {
                break now;
            }
            self.nap().await;
        };

        let tolerated_delay = self.delay_policy.tolerated_delay();
        let late = operation.scheduled_start.plus(tolerated_delay) < at;
        if late && !self.delay_policy.handle_excessive_delay(operation) {
            return Err(ExecutionError::ExcessiveDelay {
                operation_id: operation.id,
                delay: at.duration_since(operation.scheduled_start),
            });
        }
        Ok(Release {
            at,
            late_start_accepted: late,
        })
    }

    async fn nap(&self) {
        if self.config.sleep_duration.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.config.sleep_duration).await;
        }
    }
}

fn dependency_met(operation: &Operation, gct: &dyn GlobalCompletionTimeReader) -> bool {
    operation.dependency_time.is_none_or(|required| {
        gct.global_completion_time()
            .is_some_and(|current| current >= required)
    })
}
