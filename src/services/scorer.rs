use ndarray::{Array1, ArrayView1};
use std::cmp::Ordering;

use crate::{
    artifacts::{FactorModel, MatrixStore},
    config::TopKOrder,
    error::{AppError, AppResult},
};

/// Result of scoring one user
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecommendations {
    /// Selected item labels, in the configured output order
    pub items: Vec<String>,
    /// Column indices of `items`, same order
    pub indices: Vec<usize>,
    /// Sanitized predicted rating for every item
    pub predictions: Array1<f64>,
    /// How many non-finite predictions were replaced with 0.0
    pub anomalies: usize,
}

impl ScoredRecommendations {
    /// Pairs each recommended item with its predicted rating.
    pub fn item_scores(&self) -> Vec<(String, f64)> {
        self.items
            .iter()
            .zip(&self.indices)
            .map(|(item, &index)| (item.clone(), self.predictions[index]))
            .collect()
    }
}

/// Latent-factor scorer over the shared, read-only artifacts
pub struct Scorer<'a> {
    matrix: &'a MatrixStore,
    model: &'a dyn FactorModel,
    order: TopKOrder,
}

impl<'a> Scorer<'a> {
    pub fn new(matrix: &'a MatrixStore, model: &'a dyn FactorModel) -> Self {
        Self {
            matrix,
            model,
            order: TopKOrder::default(),
        }
    }

    pub fn with_order(mut self, order: TopKOrder) -> Self {
        self.order = order;
        self
    }

    /// Full predicted-rating vector for a user, before sanitization.
    pub fn predict(&self, user_id: &str) -> AppResult<Array1<f64>> {
        let row_index = self.matrix.row_index(user_id)?;
        self.predict_row(row_index)
    }

    /// Predicted ratings for an already resolved matrix row.
    pub fn predict_row(&self, row_index: usize) -> AppResult<Array1<f64>> {
        let row = self.matrix.row_vector(row_index).ok_or_else(|| {
            AppError::Internal(format!("row {} missing from rating matrix", row_index))
        })?;
        let latent = self.model.transform(row)?;
        self.model.reconstruct(latent.view())
    }

    /// Scores every item for `user_id` and keeps the best `k`.
    pub fn score_and_select(&self, user_id: &str, k: usize) -> AppResult<ScoredRecommendations> {
        let row_index = self.matrix.row_index(user_id)?;
        self.score_row(user_id, row_index, k)
    }

    /// Like [`Scorer::score_and_select`] for a user whose row is already known.
    pub fn score_row(
        &self,
        user_id: &str,
        row_index: usize,
        k: usize,
    ) -> AppResult<ScoredRecommendations> {
        let mut predictions = self.predict_row(row_index)?;

        let anomalies = sanitize(&mut predictions);
        if anomalies > 0 {
            tracing::warn!(
                user_id = %user_id,
                anomalies,
                "NaN or Inf detected in predicted ratings, replaced with 0.0"
            );
        }

        let mut indices = top_k_indices(predictions.view(), k);
        if self.order == TopKOrder::Descending {
            indices.reverse();
        }

        let items = indices
            .iter()
            .map(|&index| {
                self.matrix
                    .column_label(index)
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Internal(format!("no item label for column {}", index)))
            })
            .collect::<AppResult<Vec<_>>>()?;

        tracing::info!(user_id = %user_id, items = ?items, "Top items selected");

        Ok(ScoredRecommendations {
            items,
            indices,
            predictions,
            anomalies,
        })
    }
}

/// Replaces NaN and ±Inf with 0.0, returning how many values were replaced.
pub fn sanitize(predictions: &mut Array1<f64>) -> usize {
    let mut replaced = 0;
    predictions.mapv_inplace(|value| {
        if value.is_finite() {
            value
        } else {
            replaced += 1;
            0.0
        }
    });
    replaced
}

/// Indices of the `k` highest scores, in ascending score order (best last).
///
/// Selection ranks by score descending with ties going to the lower index.
/// The kept indices are then listed by score ascending, lower index first
/// among equal scores. Scores must already be sanitized.
pub fn top_k_indices(scores: ArrayView1<'_, f64>, k: usize) -> Vec<usize> {
    let mut kept: Vec<usize> = (0..scores.len()).collect();
    kept.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    kept.truncate(k);
    kept.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    kept
}
