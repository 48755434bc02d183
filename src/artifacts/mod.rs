//! Startup loading of the precomputed user-item matrix and factor model.
//!
//! Both artifacts are produced by the offline training job. Any failure here
//! is fatal: the service never starts without them.

use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

pub mod factor_model;
pub mod matrix;

pub use factor_model::{FactorModel, TruncatedSvd};
pub use matrix::MatrixStore;

#[derive(thiserror::Error, Debug)]
pub enum ArtifactError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid artifact: {0}")]
    Invalid(String),
}

/// On-disk form of the rating matrix: labels plus COO triplets
#[derive(Debug, Deserialize)]
pub struct MatrixArtifact {
    pub users: Vec<String>,
    pub items: Vec<String>,
    #[serde(default)]
    pub ratings: Vec<(usize, usize, f64)>,
}

/// On-disk form of the fitted factor model
#[derive(Debug, Deserialize)]
pub struct ModelArtifact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub components: Vec<Vec<f64>>,
}

/// Loaded, cross-checked artifacts shared read-only by every request
pub struct Artifacts {
    pub matrix: Arc<MatrixStore>,
    pub model: Arc<dyn FactorModel>,
}

impl Artifacts {
    /// Pairs a matrix with a model after checking their item dimensions agree.
    pub fn new(matrix: MatrixStore, model: Arc<dyn FactorModel>) -> Result<Self, ArtifactError> {
        if model.n_items() != matrix.n_items() {
            return Err(ArtifactError::Invalid(format!(
                "factor model spans {} items but the matrix has {}",
                model.n_items(),
                matrix.n_items()
            )));
        }
        Ok(Self {
            matrix: Arc::new(matrix),
            model,
        })
    }

    pub fn load(matrix_path: impl AsRef<Path>, model_path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let matrix = load_matrix(matrix_path)?;
        let model = load_model(model_path)?;
        Self::new(matrix, Arc::new(model))
    }
}

pub fn load_matrix(path: impl AsRef<Path>) -> Result<MatrixStore, ArtifactError> {
    let path = path.as_ref();
    let artifact: MatrixArtifact = read_matrix_artifact(BufReader::new(File::open(path)?))?;
    let store = MatrixStore::from_triplets(artifact.users, artifact.items, &artifact.ratings)?;

    tracing::info!(
        path = %path.display(),
        users = store.n_users(),
        items = store.n_items(),
        observed = store.nnz(),
        "User-item matrix loaded"
    );

    Ok(store)
}

pub fn load_model(path: impl AsRef<Path>) -> Result<TruncatedSvd, ArtifactError> {
    let path = path.as_ref();
    let artifact: ModelArtifact = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    let model = TruncatedSvd::from_rows(artifact.components)?;

    tracing::info!(
        path = %path.display(),
        name = artifact.name.as_deref().unwrap_or("unnamed"),
        version = artifact.version.as_deref().unwrap_or("unversioned"),
        components = model.n_components(),
        items = model.n_items(),
        "Factor model loaded"
    );

    Ok(model)
}

/// Parses a matrix artifact without building the sparse matrix.
pub fn read_matrix_artifact<R: Read>(reader: R) -> Result<MatrixArtifact, ArtifactError> {
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}", uuid::Uuid::new_v4(), name));
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_round_trip_from_disk() {
        let matrix = write_temp(
            "matrix.json",
            r#"{"users": ["u1", "u2"], "items": ["a", "b", "c"], "ratings": [[0, 0, 5.0], [1, 2, 3.0]]}"#,
        );
        let model = write_temp(
            "model.json",
            r#"{"name": "BookRecommenderModel", "version": "18", "components": [[1.0, 0.0, 0.5]]}"#,
        );

        let artifacts = Artifacts::load(&matrix, &model).unwrap();
        assert_eq!(artifacts.matrix.n_users(), 2);
        assert_eq!(artifacts.model.n_components(), 1);

        std::fs::remove_file(matrix).ok();
        std::fs::remove_file(model).ok();
    }

    #[test]
    fn test_dimension_mismatch_is_fatal() {
        let matrix = MatrixStore::from_triplets(
            vec!["u1".to_string()],
            vec!["a".to_string(), "b".to_string()],
            &[],
        )
        .unwrap();
        let model = TruncatedSvd::from_rows(vec![vec![1.0, 2.0, 3.0]]).unwrap();

        let result = Artifacts::new(matrix, Arc::new(model));
        assert!(matches!(result, Err(ArtifactError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_model("/nonexistent/svd_model.json");
        assert!(matches!(result, Err(ArtifactError::Io(_))));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let result = read_matrix_artifact(r#"{"users": "#.as_bytes());
        assert!(matches!(result, Err(ArtifactError::Parse(_))));
    }
}
