use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap};
use std::net::SocketAddr;

/// Best-effort client address for a request.
///
/// Prefers the socket peer recorded by `into_make_service_with_connect_info`,
/// then the first `X-Forwarded-For` hop, then `"unknown"`.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_from_connect_info() {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 4000))));
        assert_eq!(client_ip(&HeaderMap::new(), &extensions), "10.0.0.7");
    }

    #[test]
    fn test_client_ip_from_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers, &Extensions::new()), "203.0.113.9");
    }

    #[test]
    fn test_client_ip_unknown() {
        assert_eq!(client_ip(&HeaderMap::new(), &Extensions::new()), "unknown");
    }
}
