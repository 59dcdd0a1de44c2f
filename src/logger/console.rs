use tracing::{error, info, warn};

use super::{LogError, LogLevel, LogRecord, LogSink};

/// Forwards records to `tracing`, rendered by the process subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn write(&self, record: &LogRecord) -> Result<(), LogError> {
        let context = record.context.as_deref().unwrap_or("-");

        match record.level {
            LogLevel::Info => info!(context = %context, "{}", record.message),
            LogLevel::Warn => warn!(context = %context, "{}", record.message),
            LogLevel::Error => match record.trace.as_deref() {
                Some(trace) => error!(context = %context, trace = %trace, "{}", record.message),
                None => error!(context = %context, "{}", record.message),
            },
        }

        Ok(())
    }
}
