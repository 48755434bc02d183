use std::fmt::Display;
use std::time::Instant;

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    models::PredictResponse,
    services::{logger::LogSummary, scorer::Scorer},
};

/// Why a request ended without recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    UserNotFound,
    InternalError,
}

/// Lifecycle of a single `/predict` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Received,
    Resolved,
    Scored,
    Logged,
    Responded,
    Failed(FailureKind),
}

impl Display for RequestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestPhase::Received => write!(f, "received"),
            RequestPhase::Resolved => write!(f, "resolved"),
            RequestPhase::Scored => write!(f, "scored"),
            RequestPhase::Logged => write!(f, "logged"),
            RequestPhase::Responded => write!(f, "responded"),
            RequestPhase::Failed(FailureKind::UserNotFound) => write!(f, "failed:user_not_found"),
            RequestPhase::Failed(FailureKind::InternalError) => write!(f, "failed:internal_error"),
        }
    }
}

impl From<&AppError> for FailureKind {
    fn from(error: &AppError) -> Self {
        if error.is_not_found() {
            FailureKind::UserNotFound
        } else {
            FailureKind::InternalError
        }
    }
}

/// Everything a served request produced, including the logging outcome
#[derive(Debug)]
pub struct ServedRecommendations {
    pub response: PredictResponse,
    pub log_summary: LogSummary,
    pub phase: RequestPhase,
}

/// Scores, logs and answers one recommendation request.
///
/// Scoring failures end the request; logging failures only show up in the
/// returned [`LogSummary`].
pub async fn serve_recommendations(
    state: &AppState,
    user_id: &str,
) -> AppResult<ServedRecommendations> {
    let mut phase = RequestPhase::Received;
    tracing::info!(user_id = %user_id, phase = %phase, "Received request");

    let started_at = Instant::now();

    let scored = match state.matrix.row_index(user_id) {
        Ok(row_index) => {
            phase = RequestPhase::Resolved;
            tracing::debug!(user_id = %user_id, row_index, phase = %phase, "User resolved");

            Scorer::new(&state.matrix, state.model.as_ref())
                .with_order(state.top_k_order)
                .score_row(user_id, row_index, state.top_k)
        }
        Err(e) => Err(e),
    };

    let scored = match scored {
        Ok(scored) => scored,
        Err(e) => {
            let phase = RequestPhase::Failed(FailureKind::from(&e));
            if e.is_not_found() {
                tracing::warn!(user_id = %user_id, phase = %phase, "User not found in matrix");
            } else {
                tracing::error!(user_id = %user_id, phase = %phase, error = %e, "Prediction failed");
            }
            return Err(e);
        }
    };

    let now = Instant::now();
    phase = RequestPhase::Scored;
    tracing::info!(
        user_id = %user_id,
        phase = %phase,
        latency_ms = now.duration_since(started_at).as_secs_f64() * 1000.0,
        "Scoring completed"
    );

    let log_summary = state
        .logger
        .log_all(user_id, &scored.item_scores(), started_at, now)
        .await;
    phase = RequestPhase::Logged;
    tracing::info!(
        user_id = %user_id,
        phase = %phase,
        written = log_summary.written,
        attempted = log_summary.attempted,
        "Recommendation records logged"
    );

    phase = RequestPhase::Responded;
    Ok(ServedRecommendations {
        response: PredictResponse {
            user_id: user_id.to_string(),
            recommended_books: scored.items,
        },
        log_summary,
        phase,
    })
}
