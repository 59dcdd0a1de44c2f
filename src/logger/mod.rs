//! Application logger with pluggable sinks.
//!
//! An [`AppLogger`] is built once at startup, shared through [`Logger`], and
//! fans every record out to each configured [`LogSink`]. A sink that fails is
//! reported through `tracing` and skipped; callers never see the error.

pub mod console;
pub mod file;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::metrics::registry::LOG_SINK_FAILURES_TOTAL;

pub use console::ConsoleSink;
pub use file::FileSink;

/// Shared handle to the application logger
pub type Logger = Arc<AppLogger>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// A single log entry handed to every sink
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    /// Component that produced the record (e.g. `StudentsController`)
    pub context: Option<String>,
    /// Diagnostic trace attached to error records
    pub trace: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            context: None,
            trace: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_context(mut self, context: Option<&str>) -> Self {
        self.context = context.map(str::to_string);
        self
    }

    pub fn with_trace(mut self, trace: Option<&str>) -> Self {
        self.trace = trace.map(str::to_string);
        self
    }

    /// Tab-separated body for line-oriented sinks.
    ///
    /// Error records are prefixed with their trace, everything else with
    /// its context.
    pub fn entry(&self) -> String {
        let prefix = match self.level {
            LogLevel::Error => self.trace.as_deref(),
            LogLevel::Info | LogLevel::Warn => self.context.as_deref(),
        };

        match prefix {
            Some(prefix) => format!("{}\t{}", prefix, self.message),
            None => self.message.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("log sink '{sink}' is closed")]
    Closed { sink: &'static str },

    #[error("log sink '{sink}' is busy, record dropped")]
    Dropped { sink: &'static str },

    #[error("failed to write to log sink '{sink}': {source}")]
    Io {
        sink: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Destination for log records
pub trait LogSink: Send + Sync {
    /// Short name used when reporting sink failures
    fn name(&self) -> &'static str;

    /// Hand a record to the sink. Must not block on I/O completion.
    fn write(&self, record: &LogRecord) -> Result<(), LogError>;

    /// Flush buffered records and release resources. Called once at shutdown.
    fn close(&self) -> Result<(), LogError> {
        Ok(())
    }
}

/// Fan-out logger over a set of sinks
#[derive(Default)]
pub struct AppLogger {
    sinks: Vec<Box<dyn LogSink>>,
}

impl AppLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logger that only writes to the console
    pub fn console() -> Self {
        Self::new().with_sink(ConsoleSink)
    }

    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn log(&self, message: impl Into<String>, context: Option<&str>) {
        self.dispatch(LogRecord::new(LogLevel::Info, message).with_context(context));
    }

    pub fn warn(&self, message: impl Into<String>, context: Option<&str>) {
        self.dispatch(LogRecord::new(LogLevel::Warn, message).with_context(context));
    }

    pub fn error(&self, message: impl Into<String>, trace: Option<&str>) {
        self.dispatch(LogRecord::new(LogLevel::Error, message).with_trace(trace));
    }

    /// Write a fully built record to every sink
    pub fn dispatch(&self, record: LogRecord) {
        for sink in &self.sinks {
            if let Err(e) = sink.write(&record) {
                LOG_SINK_FAILURES_TOTAL
                    .with_label_values(&[sink.name()])
                    .inc();
                warn!(sink = sink.name(), error = %e, "Dropped log record");
            }
        }
    }

    /// Flush and close every sink
    pub fn shutdown(&self) {
        for sink in &self.sinks {
            if let Err(e) = sink.close() {
                warn!(sink = sink.name(), error = %e, "Failed to close log sink");
            }
        }
    }

    /// Handle that stamps every record with a fixed context
    pub fn scoped(self: &Arc<Self>, context: impl Into<String>) -> ScopedLogger {
        ScopedLogger {
            logger: Arc::clone(self),
            context: context.into(),
        }
    }
}

/// Logger bound to one component name
#[derive(Clone)]
pub struct ScopedLogger {
    logger: Logger,
    context: String,
}

impl ScopedLogger {
    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn log(&self, message: impl Into<String>) {
        self.logger.log(message, Some(&self.context));
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.logger.warn(message, Some(&self.context));
    }

    pub fn error(&self, message: impl Into<String>, trace: Option<&str>) {
        self.logger.dispatch(
            LogRecord::new(LogLevel::Error, message)
                .with_context(Some(&self.context))
                .with_trace(trace),
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Sink that keeps records in memory
    #[derive(Clone, Default)]
    pub struct CapturingSink {
        pub records: Arc<Mutex<Vec<LogRecord>>>,
    }

    impl CapturingSink {
        pub fn records(&self) -> Vec<LogRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    impl LogSink for CapturingSink {
        fn name(&self) -> &'static str {
            "capture"
        }

        fn write(&self, record: &LogRecord) -> Result<(), LogError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    /// Sink that rejects every record
    pub struct BrokenSink;

    impl LogSink for BrokenSink {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn write(&self, _record: &LogRecord) -> Result<(), LogError> {
            Err(LogError::Io {
                sink: "broken",
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            })
        }

        fn close(&self) -> Result<(), LogError> {
            Err(LogError::Closed { sink: "broken" })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{BrokenSink, CapturingSink};
    use super::*;

    #[test]
    fn test_entry_uses_context_for_info() {
        let record = LogRecord::new(LogLevel::Info, "hello").with_context(Some("Students"));
        assert_eq!(record.entry(), "Students\thello");
    }

    #[test]
    fn test_entry_uses_trace_for_errors() {
        let record = LogRecord::new(LogLevel::Error, "boom")
            .with_context(Some("Filter"))
            .with_trace(Some("at main"));
        assert_eq!(record.entry(), "at main\tboom");

        let bare = LogRecord::new(LogLevel::Error, "boom").with_context(Some("Filter"));
        assert_eq!(bare.entry(), "boom");
    }

    #[test]
    fn test_fan_out_reaches_every_sink() {
        let first = CapturingSink::default();
        let second = CapturingSink::default();
        let logger = AppLogger::new()
            .with_sink(first.clone())
            .with_sink(second.clone());

        logger.log("one", None);
        logger.error("two", Some("trace"));

        assert_eq!(first.records().len(), 2);
        assert_eq!(second.records().len(), 2);
        assert_eq!(second.records()[1].trace.as_deref(), Some("trace"));
    }

    #[test]
    fn test_broken_sink_does_not_starve_others() {
        let capture = CapturingSink::default();
        let logger = AppLogger::new()
            .with_sink(BrokenSink)
            .with_sink(capture.clone());

        logger.error("still delivered", None);
        logger.shutdown();

        assert_eq!(capture.records().len(), 1);
        assert_eq!(capture.records()[0].message, "still delivered");
    }

    #[test]
    fn test_scoped_logger_stamps_context() {
        let capture = CapturingSink::default();
        let logger = Arc::new(AppLogger::new().with_sink(capture.clone()));
        let scoped = logger.scoped("StudentsController");

        scoped.log("listing");
        scoped.error("failed", Some("stack"));

        let records = capture.records();
        assert_eq!(records[0].context.as_deref(), Some("StudentsController"));
        assert_eq!(records[1].level, LogLevel::Error);
        assert_eq!(records[1].trace.as_deref(), Some("stack"));
    }
}
