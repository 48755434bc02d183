use ndarray::{Array1, Array2, ArrayView1};
use sprs::CsVecView;

use super::ArtifactError;
use crate::error::{AppError, AppResult};

/// A fitted low-rank factorization used at inference time.
///
/// Implementations must be deterministic: the basis is frozen once loaded.
pub trait FactorModel: Send + Sync {
    /// Number of latent components (k)
    fn n_components(&self) -> usize;

    /// Number of items the basis spans (n)
    fn n_items(&self) -> usize;

    /// Maps a user's raw rating row (1 × n) to its latent vector (1 × k).
    fn transform(&self, row: CsVecView<'_, f64>) -> AppResult<Array1<f64>>;

    /// Predicted ratings (1 × n) as `latent · basis`.
    fn reconstruct(&self, latent: ArrayView1<'_, f64>) -> AppResult<Array1<f64>>;
}

/// Truncated SVD basis: `components` is k × n, one right-singular vector per row.
#[derive(Debug, Clone)]
pub struct TruncatedSvd {
    components: Array2<f64>,
}

impl TruncatedSvd {
    pub fn new(components: Array2<f64>) -> Result<Self, ArtifactError> {
        if components.nrows() == 0 || components.ncols() == 0 {
            return Err(ArtifactError::Invalid(
                "factor basis must have at least one component and one item".to_string(),
            ));
        }
        if components.iter().any(|v| !v.is_finite()) {
            tracing::warn!("Factor basis contains non-finite values; predictions will be sanitized");
        }
        Ok(Self { components })
    }

    /// Builds the basis from row-major component vectors.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ArtifactError> {
        let n_components = rows.len();
        let n_items = rows.first().map(Vec::len).unwrap_or(0);
        if let Some((position, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_items) {
            return Err(ArtifactError::Invalid(format!(
                "component {} has {} values, expected {}",
                position,
                row.len(),
                n_items
            )));
        }

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let components = Array2::from_shape_vec((n_components, n_items), flat)
            .map_err(|e| ArtifactError::Invalid(format!("bad component shape: {}", e)))?;
        Self::new(components)
    }

    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }
}

impl FactorModel for TruncatedSvd {
    fn n_components(&self) -> usize {
        self.components.nrows()
    }

    fn n_items(&self) -> usize {
        self.components.ncols()
    }

    fn transform(&self, row: CsVecView<'_, f64>) -> AppResult<Array1<f64>> {
        if row.dim() != self.n_items() {
            return Err(AppError::Dimension(format!(
                "rating row has {} items, factor basis spans {}",
                row.dim(),
                self.n_items()
            )));
        }

        // row · componentsᵀ, touching only the observed ratings
        let mut latent = Array1::zeros(self.n_components());
        for (item, &rating) in row.iter() {
            latent.scaled_add(rating, &self.components.column(item));
        }
        Ok(latent)
    }

    fn reconstruct(&self, latent: ArrayView1<'_, f64>) -> AppResult<Array1<f64>> {
        if latent.len() != self.n_components() {
            return Err(AppError::Dimension(format!(
                "latent vector has {} components, factor basis has {}",
                latent.len(),
                self.n_components()
            )));
        }
        Ok(latent.dot(&self.components))
    }
}
