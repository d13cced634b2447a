use crate::api::{handlers, AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;
    let request_timeout = state.request_timeout;

    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::health_check))
        .route("/health/ready", get(handlers::health_check))
        // Prometheus exposition
        .route("/metrics", get(handlers::metrics))
        // Image analysis
        .route("/analyze-image", post(handlers::analyze_image))
        .route("/api/analyze-image", post(handlers::analyze_image))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new())
                .on_response(DefaultOnResponse::new()),
        )
        .layer(CorsLayer::permissive())
}
