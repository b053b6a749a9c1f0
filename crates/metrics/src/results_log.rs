use cadence_core::OperationResult;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// One row of the results log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsLogRow<'a> {
    pub kind: &'a str,
    pub scheduled_start_ms: u64,
    pub actual_start_ms: u64,
    pub duration_ms: u64,
}

impl<'a> From<&'a OperationResult> for ResultsLogRow<'a> {
    fn from(result: &'a OperationResult) -> Self {
        Self {
            kind: &result.operation.kind,
            scheduled_start_ms: result.operation.scheduled_start.as_milli(),
            actual_start_ms: result.actual_start.as_milli(),
            duration_ms: result.run_duration.as_millis() as u64,
        }
    }
}

/// Append-only sink for per-result rows
///
/// Failing to write is never fatal to the metrics service.
pub trait ResultsLog: Send {
    fn write_row(&mut self, row: &ResultsLogRow<'_>) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub const RESULTS_LOG_HEADER: [&str; 4] = [
    "operation_type",
    "scheduled_start_time",
    "actual_start_time",
    "execution_duration",
];

/// Delimiter-separated results log
pub struct CsvResultsLog<W: Write + Send> {
    writer: W,
    delimiter: String,
}

impl CsvResultsLog<BufWriter<File>> {
    /// Create (or truncate) `path` and write the header row
    pub fn create(path: impl AsRef<Path>, delimiter: &str) -> io::Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), delimiter)
    }
}

impl<W: Write + Send> CsvResultsLog<W> {
    pub fn new(writer: W, delimiter: &str) -> io::Result<Self> {
        let mut log = Self {
            writer,
            delimiter: delimiter.to_string(),
        };
        log.write_fields(&RESULTS_LOG_HEADER)?;
        Ok(log)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_fields<S: AsRef<str>>(&mut self, fields: &[S]) -> io::Result<()> {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                self.writer.write_all(self.delimiter.as_bytes())?;
            }
            self.writer.write_all(field.as_ref().as_bytes())?;
        }
        self.writer.write_all(b"\n")
    }
}

impl<W: Write + Send> ResultsLog for CsvResultsLog<W> {
    fn write_row(&mut self, row: &ResultsLogRow<'_>) -> io::Result<()> {
        self.write_fields(&[
            row.kind.to_string(),
            row.scheduled_start_ms.to_string(),
            row.actual_start_ms.to_string(),
            row.duration_ms.to_string(),
        ])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
