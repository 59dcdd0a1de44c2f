use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    create_student, create_user, delete_student, delete_user, get_student, get_user, health,
    hello, list_students, list_users, update_student, update_user, AppState,
};
use super::middleware::logging_middleware;
use super::openapi::ApiDoc;
use crate::errors::{exception_filter, handle_panic, route_not_found};
use crate::metrics;
use crate::throttle::throttle;

pub fn create_router(state: AppState) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Only the single-student lookup is throttled here
    let students = Router::new()
        .route("/students", post(create_student).get(list_students))
        .route(
            "/students/:id",
            get(get_student)
                .route_layer(middleware::from_fn_with_state(
                    state.lookup_throttler.clone(),
                    throttle,
                ))
                .patch(update_student)
                .delete(delete_student),
        );

    let throttled = Router::new()
        .route("/", get(hello))
        .route("/users", post(create_user).get(list_users))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route_layer(middleware::from_fn_with_state(
            state.global_throttler.clone(),
            throttle,
        ));

    let api = students.merge(throttled);
    let api = if state.api_prefix.is_empty() {
        api
    } else {
        Router::new().nest(&format!("/{}", state.api_prefix), api)
    };

    Router::new()
        .merge(api)
        .route("/health", get(health))
        // Metrics endpoint (Prometheus)
        .route("/metrics", get(metrics::metrics_handler))
        // OpenAPI documentation
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(route_not_found)
        // Innermost first: panics become failures, failures become envelopes
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(
            state.normalizer.clone(),
            exception_filter,
        ))
        .layer(middleware::from_fn(metrics::middleware::track_metrics))
        .layer(middleware::from_fn(logging_middleware))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Add shared state
        .with_state(state)
}
