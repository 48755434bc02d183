use sprs::{CsMat, CsVecView, TriMat};
use std::collections::HashMap;

use super::ArtifactError;
use crate::error::{AppError, AppResult};

/// Read-only user × item rating matrix with its row and column labels.
///
/// Rows are users and columns are items, both in the order the ingestion
/// step wrote them. Unobserved cells are implicit zeros of the CSR layout.
#[derive(Debug)]
pub struct MatrixStore {
    ratings: CsMat<f64>,
    user_ids: Vec<String>,
    item_ids: Vec<String>,
    user_index: HashMap<String, usize>,
    item_index: HashMap<String, usize>,
}

impl MatrixStore {
    /// Builds the store from COO triplets `(row, col, rating)`.
    ///
    /// A repeated `(row, col)` pair keeps the last rating seen.
    pub fn from_triplets(
        user_ids: Vec<String>,
        item_ids: Vec<String>,
        triplets: &[(usize, usize, f64)],
    ) -> Result<Self, ArtifactError> {
        let user_index = label_index(&user_ids, "user")?;
        let item_index = label_index(&item_ids, "item")?;
        let shape = (user_ids.len(), item_ids.len());

        let mut cells: HashMap<(usize, usize), f64> = HashMap::with_capacity(triplets.len());
        for &(row, col, value) in triplets {
            if row >= shape.0 || col >= shape.1 {
                return Err(ArtifactError::Invalid(format!(
                    "rating at ({}, {}) is outside the {}x{} matrix",
                    row, col, shape.0, shape.1
                )));
            }
            if !value.is_finite() {
                return Err(ArtifactError::Invalid(format!(
                    "rating at ({}, {}) is not finite",
                    row, col
                )));
            }
            cells.insert((row, col), value);
        }

        let mut tri = TriMat::with_capacity(shape, cells.len());
        for ((row, col), value) in cells {
            tri.add_triplet(row, col, value);
        }

        Ok(Self {
            ratings: tri.to_csr(),
            user_ids,
            item_ids,
            user_index,
            item_index,
        })
    }

    pub fn row_index(&self, user_id: &str) -> AppResult<usize> {
        self.user_index
            .get(user_id)
            .copied()
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    /// Sparse rating row of a user, `None` when the index is out of range.
    pub fn row_vector(&self, index: usize) -> Option<CsVecView<'_, f64>> {
        self.ratings.outer_view(index)
    }

    pub fn column_label(&self, index: usize) -> Option<&str> {
        self.item_ids.get(index).map(String::as_str)
    }

    pub fn column_index(&self, item_id: &str) -> AppResult<usize> {
        self.item_index
            .get(item_id)
            .copied()
            .ok_or_else(|| AppError::ItemNotFound(item_id.to_string()))
    }

    /// User labels in row order
    pub fn user_ids(&self) -> &[String] {
        &self.user_ids
    }

    /// Item labels in column order
    pub fn item_ids(&self) -> &[String] {
        &self.item_ids
    }

    pub fn n_users(&self) -> usize {
        self.user_ids.len()
    }

    pub fn n_items(&self) -> usize {
        self.item_ids.len()
    }

    /// Number of observed (stored) ratings
    pub fn nnz(&self) -> usize {
        self.ratings.nnz()
    }
}

fn label_index(labels: &[String], kind: &str) -> Result<HashMap<String, usize>, ArtifactError> {
    let mut index = HashMap::with_capacity(labels.len());
    for (position, label) in labels.iter().enumerate() {
        if index.insert(label.clone(), position).is_some() {
            return Err(ArtifactError::Invalid(format!(
                "duplicate {} label '{}'",
                kind, label
            )));
        }
    }
    Ok(index)
}
