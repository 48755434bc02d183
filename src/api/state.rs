use std::sync::Arc;

use crate::{
    artifacts::{Artifacts, FactorModel, MatrixStore},
    config::{Config, TopKOrder},
    db::RecordStore,
    services::RecommendationLogger,
};

/// Shared application state
///
/// Everything in here is built once at startup and is read-only afterwards,
/// so handlers share it without locking.
#[derive(Clone)]
pub struct AppState {
    pub matrix: Arc<MatrixStore>,
    pub model: Arc<dyn FactorModel>,
    pub logger: RecommendationLogger,
    pub top_k: usize,
    pub top_k_order: TopKOrder,
    pub monitoring_sample_size: usize,
}

impl AppState {
    pub fn new(artifacts: Artifacts, store: Arc<dyn RecordStore>, config: &Config) -> Self {
        Self {
            matrix: artifacts.matrix,
            model: artifacts.model,
            logger: RecommendationLogger::new(
                store,
                config.decimal_precision,
                config.log_write_timeout(),
            ),
            top_k: config.top_k,
            top_k_order: config.top_k_order,
            monitoring_sample_size: config.monitoring_sample_size,
        }
    }
}
