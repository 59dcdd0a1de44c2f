use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::failure::MessageBody;
use crate::utils::time::iso_timestamp;

/// JSON body returned for every failed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// HTTP status of the response
    pub status_code: u16,
    /// Human or machine readable description
    #[schema(value_type = Object)]
    pub message: MessageBody,
    /// Short classification label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Request URL that failed
    pub path: String,
    /// ISO-8601 time the failure was handled
    pub timestamp: String,
    /// Copy of `message` kept for older clients; ignore in new code
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub response: Option<MessageBody>,
}

impl ErrorEnvelope {
    pub fn new(
        status_code: u16,
        message: MessageBody,
        error: Option<String>,
        path: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            status_code,
            response: Some(message.clone()),
            message,
            error,
            path: path.into(),
            timestamp: iso_timestamp(now),
        }
    }

    /// Drop the duplicated `response` field
    pub fn without_compat_response(mut self) -> Self {
        self.response = None;
        self
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_serializes_wire_shape() {
        let envelope = ErrorEnvelope::new(
            400,
            MessageBody::from("name must not be empty"),
            Some("Validation Error".to_string()),
            "/api/students",
            fixed_now(),
        );

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "statusCode": 400,
                "message": "name must not be empty",
                "error": "Validation Error",
                "path": "/api/students",
                "timestamp": "2024-01-02T03:04:05.000Z",
                "response": "name must not be empty",
            })
        );
    }

    #[test]
    fn test_absent_error_is_omitted_not_null() {
        let envelope = ErrorEnvelope::new(
            500,
            MessageBody::from("Internal server error"),
            None,
            "/",
            fixed_now(),
        );

        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_structured_message_kept_as_json() {
        let envelope = ErrorEnvelope::new(
            400,
            MessageBody::Structured(json!(["name should not be empty"])),
            Some("Bad Request".to_string()),
            "/api/users",
            fixed_now(),
        );

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["message"], json!(["name should not be empty"]));
        assert_eq!(value["response"], value["message"]);
    }

    #[test]
    fn test_without_compat_response() {
        let envelope =
            ErrorEnvelope::new(500, MessageBody::from("x"), None, "/", fixed_now())
                .without_compat_response();
        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value.get("response").is_none());
    }

    #[test]
    fn test_into_response_status_and_content_type() {
        let response = ErrorEnvelope::new(
            429,
            MessageBody::from("ThrottlerException: Too Many Requests"),
            None,
            "/api/users",
            fixed_now(),
        )
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_unrepresentable_status_falls_back_to_500() {
        let envelope = ErrorEnvelope::new(1000, MessageBody::from("x"), None, "/", fixed_now());
        assert_eq!(envelope.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
