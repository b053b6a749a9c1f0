use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One failure funnelled into an [`ErrorReporter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    pub source: String,
    pub message: String,
}

/// Shared sink for failures raised on service threads
///
/// Service threads report here instead of panicking; callers polling for
/// replies check [`ErrorReporter::error_encountered`] so they fail fast
/// instead of waiting out their full deadline.
#[derive(Default)]
pub struct ErrorReporter {
    encountered: AtomicBool,
    errors: Mutex<Vec<ReportedError>>,
}

impl ErrorReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record a failure raised by `source`
    pub fn report(&self, source: &str, message: impl Into<String>) {
        let message = message.into();
        log::error!("[{}] {}", source, message);
        self.errors.lock().push(ReportedError {
            source: source.to_string(),
            message,
        });
        self.encountered.store(true, Ordering::Release);
    }

    pub fn error_encountered(&self) -> bool {
        self.encountered.load(Ordering::Acquire)
    }

    /// Snapshot of every failure reported so far, in report order
    pub fn errors(&self) -> Vec<ReportedError> {
        self.errors.lock().clone()
    }
}

impl fmt::Display for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = self.errors.lock();
        for (i, error) in errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[{}] {}", error.source, error.message)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("errors", &*self.errors.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_starts_clean() {
        let reporter = ErrorReporter::new();
        assert!(!reporter.error_encountered());
        assert!(reporter.errors().is_empty());
        assert_eq!(reporter.to_string(), "");
    }

    #[test]
    fn test_collects_reports_from_many_threads() {
        let reporter = ErrorReporter::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let reporter = Arc::clone(&reporter);
                thread::spawn(move || reporter.report(&format!("worker-{i}"), "boom"))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(reporter.error_encountered());
        assert_eq!(reporter.errors().len(), 4);
        assert_eq!(reporter.to_string().lines().count(), 4);
    }
}
