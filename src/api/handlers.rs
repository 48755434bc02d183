use axum::{
    extract::{Query, State},
    Extension, Json,
};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{HealthResponse, MonitoringSummary, PredictQuery, PredictResponse},
    services::{monitoring, serve_recommendations},
};

use super::AppState;

/// Liveness check, independent of the loaded model and the record store
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Top-k recommendations for one user
pub async fn predict(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<PredictQuery>,
) -> AppResult<Json<PredictResponse>> {
    tracing::info!(
        request_id = %request_id,
        user_id = %query.user_id,
        "Processing prediction request"
    );

    let served = serve_recommendations(&state, &query.user_id).await?;

    if !served.log_summary.is_complete() {
        tracing::warn!(
            request_id = %request_id,
            failed_writes = served.log_summary.failures.len(),
            "Responding with incomplete audit log"
        );
    }

    Ok(Json(served.response))
}

/// Aggregates over the most recent recommendation records
pub async fn monitoring_summary(
    State(state): State<AppState>,
) -> AppResult<Json<MonitoringSummary>> {
    let summary = monitoring::summarize_recent(
        state.logger.store().as_ref(),
        state.monitoring_sample_size,
    )
    .await?;
    Ok(Json(summary))
}
