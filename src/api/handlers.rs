use crate::api::AppState;
use crate::classification::{
    ClassificationError, ClassificationOutcome, ClassificationRequest, ClassificationResult,
};
use crate::config::UnconfiguredPolicy;
use crate::error::{AppError, Result};
use crate::metrics::gather_metrics;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider_configured: state.classifier.is_configured(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub provider_configured: bool,
}

/// Prometheus metrics in text exposition format
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}

/// Classify an incident image.
///
/// Answers 200 with a usable record for every outcome except a missing image
/// (400), an unreadable body (400), and, when configured to refuse, a missing
/// provider credential (503).
pub async fn analyze_image(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ClassificationRequest>, JsonRejection>,
) -> Result<Json<ClassificationResult>> {
    let Json(request) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    let classification = state.classifier.classify_request(&request).await?;

    if classification.outcome == ClassificationOutcome::NotConfigured
        && state.unconfigured_policy == UnconfiguredPolicy::Unavailable
    {
        return Err(ClassificationError::ServiceNotConfigured.into());
    }

    Ok(Json(classification.result))
}
