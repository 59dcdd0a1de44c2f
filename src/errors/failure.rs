use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Error payload carried by a deliberately raised failure, or the message of
/// an error envelope: either plain text or an arbitrary JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageBody {
    Text(String),
    Structured(Value),
}

impl MessageBody {
    /// Text form used in log lines; structured bodies are rendered as JSON
    pub fn to_log_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(value) => value.to_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(_) => None,
        }
    }
}

impl From<&str> for MessageBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for MessageBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for MessageBody {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Structured(other),
        }
    }
}

/// Everything that can go wrong while serving a request.
///
/// Each variant is built where the failure originates; the exception filter
/// turns it into an [`ErrorEnvelope`](super::ErrorEnvelope).
#[derive(Debug, Clone, PartialEq)]
pub enum FailureInput {
    /// Raised on purpose with the HTTP status it should produce
    Application {
        status: u16,
        body: MessageBody,
        trace: Option<String>,
    },

    /// Malformed input to a data operation
    Validation { raw_message: String },

    /// Well-formed but rejected data operation, with the store's error code
    Request { code: String, raw_message: String },

    /// Any other typed error
    Generic {
        name: String,
        raw_message: String,
        stack: Option<String>,
    },

    /// A failure with no usable shape
    Unknown,
}

impl FailureInput {
    pub fn application(status: StatusCode, body: impl Into<MessageBody>) -> Self {
        Self::Application {
            status: status.as_u16(),
            body: body.into(),
            trace: None,
        }
    }

    /// Structured `{statusCode, message, error}` body labelled with the
    /// status' canonical reason, as the built-in HTTP exceptions produce.
    pub fn http(status: StatusCode, message: impl Into<Value>) -> Self {
        let label = status.canonical_reason().unwrap_or("Error");
        Self::application(
            status,
            MessageBody::Structured(json!({
                "statusCode": status.as_u16(),
                "message": message.into(),
                "error": label,
            })),
        )
    }

    pub fn bad_request(message: impl Into<Value>) -> Self {
        Self::http(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<Value>) -> Self {
        Self::http(StatusCode::NOT_FOUND, message)
    }

    pub fn too_many_requests() -> Self {
        Self::application(
            StatusCode::TOO_MANY_REQUESTS,
            "ThrottlerException: Too Many Requests",
        )
    }

    pub fn validation(raw_message: impl Into<String>) -> Self {
        Self::Validation {
            raw_message: raw_message.into(),
        }
    }

    pub fn request(code: impl Into<String>, raw_message: impl Into<String>) -> Self {
        Self::Request {
            code: code.into(),
            raw_message: raw_message.into(),
        }
    }

    /// Missing row for an operation that requires one
    pub fn record_not_found(model: &str, id: impl std::fmt::Display) -> Self {
        Self::request(
            "NOT_FOUND",
            format!("No {} found with id {}", model, id),
        )
    }

    pub fn generic(name: impl Into<String>, raw_message: impl Into<String>) -> Self {
        Self::Generic {
            name: name.into(),
            raw_message: raw_message.into(),
            stack: None,
        }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        match &mut self {
            Self::Application { trace: slot, .. } => *slot = Some(trace.into()),
            Self::Generic { stack, .. } => *stack = Some(trace.into()),
            Self::Validation { .. } | Self::Request { .. } | Self::Unknown => {}
        }
        self
    }

    /// Diagnostic trace, when the failure wraps a native error
    pub fn trace(&self) -> Option<&str> {
        match self {
            Self::Application { trace, .. } => trace.as_deref(),
            Self::Generic { stack, .. } => stack.as_deref(),
            Self::Validation { .. } | Self::Request { .. } | Self::Unknown => None,
        }
    }

    /// Short variant name used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Application { .. } => "application",
            Self::Validation { .. } => "validation",
            Self::Request { .. } => "request",
            Self::Generic { .. } => "generic",
            Self::Unknown => "unknown",
        }
    }
}

/// The response is a placeholder: the exception filter middleware picks the
/// failure out of the extensions and replaces the whole response.
impl IntoResponse for FailureInput {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl From<anyhow::Error> for FailureInput {
    fn from(err: anyhow::Error) -> Self {
        Self::Generic {
            name: "Error".to_string(),
            raw_message: err.to_string(),
            stack: Some(format!("{:?}", err)),
        }
    }
}

impl From<JsonRejection> for FailureInput {
    fn from(rejection: JsonRejection) -> Self {
        Self::http(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for FailureInput {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for FailureInput {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for FailureInput {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => {
                Self::request("NOT_FOUND", "Record required by the operation was not found")
            }
            sqlx::Error::Database(db_err) => match db_err.code() {
                Some(code) => Self::request(code.into_owned(), db_err.message()),
                None => Self::generic("DatabaseError", db_err.message()),
            },
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::Encode(_)
            | sqlx::Error::TypeNotFound { .. } => Self::validation(err.to_string()),
            _ => Self::Generic {
                name: "DatabaseError".to_string(),
                raw_message: err.to_string(),
                stack: Some(format!("{:?}", err)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_builds_structured_body() {
        let failure = FailureInput::not_found("User Not Found");
        match failure {
            FailureInput::Application { status, body, .. } => {
                assert_eq!(status, 404);
                assert_eq!(
                    body,
                    MessageBody::Structured(json!({
                        "statusCode": 404,
                        "message": "User Not Found",
                        "error": "Not Found",
                    }))
                );
            }
            other => panic!("unexpected failure: {:?}", other),
        }
    }

    #[test]
    fn test_message_body_from_value() {
        assert_eq!(MessageBody::from(json!("plain")), MessageBody::Text("plain".into()));
        assert_eq!(
            MessageBody::from(json!(["a", "b"])),
            MessageBody::Structured(json!(["a", "b"]))
        );
    }

    #[test]
    fn test_message_body_log_text() {
        assert_eq!(MessageBody::from("plain").to_log_text(), "plain");
        assert_eq!(
            MessageBody::Structured(json!({"message": "x"})).to_log_text(),
            r#"{"message":"x"}"#
        );
    }

    #[test]
    fn test_trace_only_on_native_errors() {
        let generic = FailureInput::generic("TypeError", "bad").with_trace("at line 1");
        assert_eq!(generic.trace(), Some("at line 1"));

        let validation = FailureInput::validation("bad").with_trace("ignored");
        assert_eq!(validation.trace(), None);
    }

    #[test]
    fn test_anyhow_becomes_generic() {
        let failure = FailureInput::from(anyhow::anyhow!("connection reset"));
        match failure {
            FailureInput::Generic {
                name,
                raw_message,
                stack,
            } => {
                assert_eq!(name, "Error");
                assert_eq!(raw_message, "connection reset");
                assert!(stack.is_some());
            }
            other => panic!("unexpected failure: {:?}", other),
        }
    }

    #[test]
    fn test_into_response_carries_failure() {
        let response = FailureInput::Unknown.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.extensions().get::<FailureInput>(),
            Some(&FailureInput::Unknown)
        );
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn test_sqlx_row_not_found() {
        let failure = FailureInput::from(sqlx::Error::RowNotFound);
        assert!(matches!(failure, FailureInput::Request { ref code, .. } if code == "NOT_FOUND"));
    }
}
