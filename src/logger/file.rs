use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::info;
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use super::{LogError, LogRecord, LogSink};
use crate::utils::time::iso_timestamp;

const LOG_FILE_PREFIX: &str = "app";
const LOG_FILE_SUFFIX: &str = "log";
/// Lines that may wait for the writer thread before new ones are dropped
const DEFAULT_QUEUE_LINES: usize = 128_000;

/// Appends records to `<dir>/app.log`, one tab-separated line each.
///
/// Lines are handed to a background writer thread, so `write` returns as soon
/// as the line is queued. When the queue is full the line is dropped rather
/// than making the caller wait, and `write` reports it as [`LogError::Dropped`].
/// The writer is drained when the sink is closed.
pub struct FileSink {
    path: PathBuf,
    writer: NonBlocking,
    guard: Mutex<Option<WorkerGuard>>,
    closed: AtomicBool,
}

impl FileSink {
    /// Create the log directory if needed and start the writer thread
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_queue(dir, DEFAULT_QUEUE_LINES)
    }

    fn open_with_queue(dir: impl AsRef<Path>, queue_lines: usize) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix(LOG_FILE_SUFFIX)
            .build(dir)
            .with_context(|| format!("Failed to open log file in {}", dir.display()))?;

        let (writer, guard) = NonBlockingBuilder::default()
            .lossy(true)
            .buffered_lines_limit(queue_lines)
            .thread_name("app-log-writer")
            .finish(appender);

        let path = dir.join(format!("{}.{}", LOG_FILE_PREFIX, LOG_FILE_SUFFIX));
        info!("Writing application log to {}", path.display());

        Ok(Self {
            path,
            writer,
            guard: Mutex::new(Some(guard)),
            closed: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format_line(record: &LogRecord) -> String {
        format!("{}\t{}\n", iso_timestamp(record.timestamp), record.entry())
    }
}

impl LogSink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    fn write(&self, record: &LogRecord) -> Result<(), LogError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LogError::Closed { sink: "file" });
        }

        let line = Self::format_line(record);
        let dropped = self.writer.error_counter();
        let dropped_before = dropped.dropped_lines();

        let mut writer = self.writer.clone();
        writer
            .write_all(line.as_bytes())
            .map_err(|source| LogError::Io { sink: "file", source })?;

        if dropped.dropped_lines() > dropped_before {
            return Err(LogError::Dropped { sink: "file" });
        }
        Ok(())
    }

    fn close(&self) -> Result<(), LogError> {
        self.closed.store(true, Ordering::Release);
        // Dropping the guard drains queued lines and stops the writer thread
        let guard = match self.guard.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(guard);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LogLevel;

    #[test]
    fn test_format_line() {
        let record = LogRecord::new(LogLevel::Info, "Server started").with_context(Some("Main"));
        let line = FileSink::format_line(&record);

        let fields: Vec<&str> = line.trim_end().split('\t').collect();
        assert_eq!(fields.len(), 3);
        assert!(fields[0].ends_with('Z'));
        assert_eq!(fields[1], "Main");
        assert_eq!(fields[2], "Server started");
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_writes_reach_file_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let sink = FileSink::open(&log_dir).unwrap();

        sink.write(&LogRecord::new(LogLevel::Info, "first").with_context(Some("Test")))
            .unwrap();
        sink.write(
            &LogRecord::new(LogLevel::Error, "Exception caught: boom").with_trace(Some("trace-1")),
        )
        .unwrap();
        sink.close().unwrap();

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("\tTest\tfirst"));
        assert!(lines[1].ends_with("\ttrace-1\tException caught: boom"));
    }

    #[test]
    fn test_full_queue_drops_instead_of_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::open_with_queue(dir.path(), 1).unwrap();

        let total = 500;
        let mut dropped = 0;
        for i in 0..total {
            match sink.write(&LogRecord::new(LogLevel::Info, format!("line {}", i))) {
                Ok(()) => {}
                Err(LogError::Dropped { sink: "file" }) => dropped += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        sink.close().unwrap();

        let written = std::fs::read_to_string(sink.path()).unwrap().lines().count();
        assert!(written >= 1);
        assert_eq!(written + dropped, total);
    }

    #[test]
    fn test_write_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::open(dir.path()).unwrap();
        sink.close().unwrap();

        let result = sink.write(&LogRecord::new(LogLevel::Info, "late"));
        assert!(matches!(result, Err(LogError::Closed { sink: "file" })));
    }
}
