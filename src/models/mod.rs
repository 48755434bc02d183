use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One audit entry per (user, recommended item) per served request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationRecord {
    pub user_id: String,
    pub item_id: String,
    /// Bounded-precision predicted rating, `0.0` when it could not be represented
    pub predicted_rating: BigDecimal,
    /// Unix timestamp in seconds
    pub timestamp: i64,
    /// Seconds spent computing the whole top-k list
    pub latency: BigDecimal,
}

impl RecommendationRecord {
    /// Composite key the record is upserted under
    pub fn key(&self) -> RecordKey {
        RecordKey {
            user_id: self.user_id.clone(),
            item_id: self.item_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub user_id: String,
    pub item_id: String,
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rec:{}:{}", self.user_id, self.item_id)
    }
}

// ============================================================================
// HTTP payloads
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictResponse {
    pub user_id: String,
    pub recommended_books: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Aggregates over the most recent recommendation records
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitoringSummary {
    pub sample_size: usize,
    pub average_latency_seconds: f64,
    /// Count of records per predicted rating, bucketed to one decimal place
    pub rating_distribution: BTreeMap<String, usize>,
}
