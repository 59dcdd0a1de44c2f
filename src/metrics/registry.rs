use lazy_static::lazy_static;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Database Metrics
    pub static ref DATABASE_QUERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "database_queries_total",
        "Total database queries",
        &["query_type", "outcome"]  // query_type: select, insert, update, delete
    )
    .unwrap();

    pub static ref DATABASE_QUERY_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "database_query_duration_seconds",
        "Database query duration in seconds",
        &["query_type"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    // Error Metrics
    pub static ref ERRORS_NORMALIZED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "errors_normalized_total",
        "Failures turned into error envelopes",
        &["status", "kind"]  // kind: application, validation, request, generic, unknown
    )
    .unwrap();

    pub static ref LOG_SINK_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "log_sink_failures_total",
        "Log records a sink failed to accept",
        &["sink"]
    )
    .unwrap();

    // Rate Limiting Metrics
    pub static ref THROTTLED_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "throttled_requests_total",
        "Requests rejected by a throttle tier",
        &["tier"]
    )
    .unwrap();
}

/// Initialize all metrics (called on startup)
pub fn init_metrics() {
    // Force lazy_static initialization
    lazy_static::initialize(&HTTP_REQUESTS_TOTAL);
    lazy_static::initialize(&HTTP_REQUEST_DURATION_SECONDS);
    lazy_static::initialize(&DATABASE_QUERIES_TOTAL);
    lazy_static::initialize(&DATABASE_QUERY_DURATION_SECONDS);
    lazy_static::initialize(&ERRORS_NORMALIZED_TOTAL);
    lazy_static::initialize(&LOG_SINK_FAILURES_TOTAL);
    lazy_static::initialize(&THROTTLED_REQUESTS_TOTAL);
}
