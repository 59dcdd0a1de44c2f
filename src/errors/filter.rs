use axum::{
    extract::{OriginalUri, Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::any::Any;
use std::sync::Arc;

use super::failure::FailureInput;
use super::normalizer::ErrorNormalizer;

/// Replace any response that carries a [`FailureInput`] with its envelope.
///
/// Must sit outside every layer and handler that can fail, so it sees the
/// original request URL and every failure exactly once. Bodiless error
/// responses produced by the router itself (such as a 405 for a known path
/// with an unrouted method) are normalized too.
pub async fn exception_filter(
    State(normalizer): State<Arc<ErrorNormalizer>>,
    request: Request,
    next: Next,
) -> Response {
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.clone())
        .unwrap_or_else(|| request.uri().clone());
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let method = request.method().clone();

    let mut response = next.run(request).await;

    let failure = match response.extensions_mut().remove::<FailureInput>() {
        Some(failure) => failure,
        None => match unhandled_failure(&response, &method, uri.path()) {
            Some(failure) => failure,
            None => return response,
        },
    };

    normalizer
        .normalize(&failure, &path, Utc::now())
        .into_response()
}

/// Failure for an error response that no handler described
fn unhandled_failure(response: &Response, method: &Method, path: &str) -> Option<FailureInput> {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error())
        || response.headers().contains_key(header::CONTENT_TYPE)
    {
        return None;
    }

    if status == StatusCode::METHOD_NOT_ALLOWED {
        return Some(cannot_route(method, path));
    }
    Some(FailureInput::http(
        status,
        status.canonical_reason().unwrap_or("Error"),
    ))
}

fn cannot_route(method: &Method, path: &str) -> FailureInput {
    FailureInput::not_found(format!("Cannot {} {}", method, path))
}

/// Turn a handler panic into a failure for the exception filter
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let failure = if let Some(message) = payload.downcast_ref::<String>() {
        FailureInput::generic("Panic", message.clone())
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        FailureInput::generic("Panic", *message)
    } else {
        FailureInput::Unknown
    };

    failure.into_response()
}

/// Fallback for requests that match no route
pub async fn route_not_found(method: Method, OriginalUri(uri): OriginalUri) -> FailureInput {
    cannot_route(&method, uri.path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::AppLogger;
    use axum::{body::Body, middleware, routing::get, Router};
    use serde_json::Value;
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    fn app(router: Router) -> Router {
        let logger = Arc::new(AppLogger::new());
        let normalizer = Arc::new(ErrorNormalizer::new(&logger));
        router
            .fallback(route_not_found)
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(middleware::from_fn_with_state(normalizer, exception_filter))
    }

    async fn call(router: Router, uri: &str) -> (StatusCode, Value) {
        call_with(router, "GET", uri).await
    }

    async fn call_with(router: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let router = app(Router::new().route("/ok", get(|| async { "fine" })));
        let response = router
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_failure_becomes_envelope() {
        async fn fails() -> Result<&'static str, FailureInput> {
            Err(FailureInput::request("NOT_FOUND", "No Student found with id 3"))
        }

        let router = app(Router::new().route("/students/:id", get(fails)));
        let (status, body) = call(router, "/students/3?verbose=1").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["error"], "Database Error: NOT_FOUND");
        assert_eq!(body["path"], "/students/3?verbose=1");
        assert_eq!(body["message"], body["response"]);
    }

    #[tokio::test]
    async fn test_panic_becomes_generic_failure() {
        async fn explodes() -> &'static str {
            panic!("roster index out of range")
        }

        let router = app(Router::new().route("/boom", get(explodes)));
        let (status, body) = call(router, "/boom").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Panic");
        assert_eq!(body["message"], "roster index out of range");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let router = app(Router::new());
        let (status, body) = call(router, "/nowhere").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Cannot GET /nowhere");
        assert_eq!(body["error"], "Not Found");
    }

    #[tokio::test]
    async fn test_non_string_panic_is_unknown_failure() {
        async fn explodes() -> &'static str {
            std::panic::panic_any(42u8)
        }

        let router = app(Router::new().route("/boom", get(explodes)));
        let (status, body) = call(router, "/boom").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["statusCode"], 500);
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_wrong_method_is_not_found_envelope() {
        let router = app(Router::new().route("/students/:id", get(|| async { "found" })));
        let (status, body) = call_with(router, "PUT", "/students/1").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["statusCode"], 404);
        assert_eq!(body["message"], "Cannot PUT /students/1");
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["path"], "/students/1");
    }

    #[tokio::test]
    async fn test_bodiless_error_gets_envelope() {
        async fn teapot() -> StatusCode {
            StatusCode::IM_A_TEAPOT
        }

        let router = app(Router::new().route("/tea", get(teapot)));
        let (status, body) = call(router, "/tea").await;

        assert_eq!(status, StatusCode::IM_A_TEAPOT);
        assert_eq!(body["message"], "I'm a teapot");
        assert_eq!(body["error"], "I'm a teapot");
    }
}
