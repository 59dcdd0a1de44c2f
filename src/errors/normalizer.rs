//! Classification of request failures into error envelopes.
//!
//! Rules are checked in order and the first match wins:
//!
//! 1. `Application` keeps its declared status and body.
//! 2. `Validation` is a 400 whose message is the last line of the raw text.
//! 3. `Request` is a 400 labelled with the store's error code.
//! 4. `Generic` is a 500 labelled with the error name.
//! 5. Anything else is an opaque 500.
//!
//! The labels below are fixed; clients match on them.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::envelope::ErrorEnvelope;
use super::failure::{FailureInput, MessageBody};
use crate::logger::{Logger, ScopedLogger};
use crate::metrics::registry::ERRORS_NORMALIZED_TOTAL;

pub const VALIDATION_ERROR_LABEL: &str = "Validation Error";
pub const REQUEST_ERROR_PREFIX: &str = "Database Error: ";
pub const INVALID_INPUT_MESSAGE: &str = "Invalid input data";
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

const LOG_CONTEXT: &str = "ExceptionFilter";

/// Outcome of the classification policy, before the envelope is stamped
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: u16,
    pub message: MessageBody,
    pub error: Option<String>,
}

/// Apply the classification policy to a failure
pub fn classify(failure: &FailureInput) -> Classification {
    match failure {
        FailureInput::Application { status, body, .. } => {
            let (message, error) = match body {
                MessageBody::Text(text) => (MessageBody::Text(text.clone()), None),
                MessageBody::Structured(value) => (
                    structured_message(value),
                    value.get("error").and_then(Value::as_str).map(str::to_string),
                ),
            };
            Classification {
                status: *status,
                message,
                error,
            }
        }
        FailureInput::Validation { raw_message } => Classification {
            status: 400,
            message: MessageBody::Text(last_line(raw_message)),
            error: Some(VALIDATION_ERROR_LABEL.to_string()),
        },
        FailureInput::Request { code, raw_message } => Classification {
            status: 400,
            message: MessageBody::Text(raw_message.clone()),
            error: Some(format!("{}{}", REQUEST_ERROR_PREFIX, code)),
        },
        FailureInput::Generic {
            name, raw_message, ..
        } => Classification {
            status: 500,
            message: MessageBody::Text(raw_message.clone()),
            error: Some(name.clone()),
        },
        FailureInput::Unknown => Classification {
            status: 500,
            message: MessageBody::Text(INTERNAL_ERROR_MESSAGE.to_string()),
            error: None,
        },
    }
}

/// `message` key of a structured body; missing, null and empty fall back
fn structured_message(body: &Value) -> MessageBody {
    match body.get("message") {
        None | Some(Value::Null) => MessageBody::Text(UNKNOWN_ERROR_MESSAGE.to_string()),
        Some(Value::String(text)) if text.is_empty() => {
            MessageBody::Text(UNKNOWN_ERROR_MESSAGE.to_string())
        }
        Some(value) => MessageBody::from(value.clone()),
    }
}

/// Last non-empty line of a multi-line store message, returned verbatim
fn last_line(raw: &str) -> String {
    raw.split('\n')
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or(INVALID_INPUT_MESSAGE)
        .to_string()
}

/// Terminal handler for request failures.
///
/// Holds no per-request state; one instance serves every request.
pub struct ErrorNormalizer {
    logger: ScopedLogger,
    compat_response: bool,
}

impl ErrorNormalizer {
    pub fn new(logger: &Logger) -> Self {
        Self {
            logger: logger.scoped(LOG_CONTEXT),
            compat_response: true,
        }
    }

    /// Toggle the duplicated `response` field (on by default)
    pub fn with_compat_response(mut self, enabled: bool) -> Self {
        self.compat_response = enabled;
        self
    }

    /// Classify `failure`, log it once, and build the envelope
    pub fn normalize(
        &self,
        failure: &FailureInput,
        request_path: &str,
        now: DateTime<Utc>,
    ) -> ErrorEnvelope {
        let Classification {
            status,
            message,
            error,
        } = classify(failure);

        // Sink failures are swallowed by the logger
        self.logger.error(
            format!("Exception caught: {}", message.to_log_text()),
            failure.trace(),
        );

        ERRORS_NORMALIZED_TOTAL
            .with_label_values(&[&status.to_string(), failure.kind()])
            .inc();

        let envelope = ErrorEnvelope::new(status, message, error, request_path, now);
        if self.compat_response {
            envelope
        } else {
            envelope.without_compat_response()
        }
    }
}
