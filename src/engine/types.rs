use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::FieldError;

/// Triage engine errors. None of these reach the caller of `predict`;
/// they are logged and mapped to the safe default result.
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Invalid patient input: {0}")]
    Input(#[from] FieldError),

    #[error("Expected {expected} features, got {got}")]
    FeatureCount { expected: usize, got: usize },

    #[error("Model artifact not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("Failed to read model artifact {}: {}", .0.display(), .1)]
    ArtifactRead(PathBuf, String),

    #[error("Failed to parse model artifact {0}: {1}")]
    ArtifactParse(&'static str, String),

    #[error("Model artifacts are inconsistent: {0}")]
    ArtifactInconsistent(String),

    #[error("Failed to persist model artifacts: {0}")]
    Persist(String),

    #[error("Training data is empty or malformed: {0}")]
    Training(String),

    #[error("Class index {0} has no label")]
    UnknownClass(usize),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// A fitted multi-class classifier over standardized features.
pub trait Classifier {
    /// Number of input features the classifier was fitted on.
    fn n_features(&self) -> usize;

    /// Number of encoded classes.
    fn n_classes(&self) -> usize;

    /// Predicted class index.
    fn predict(&self, x: &[f64]) -> Result<usize, TriageError>;

    /// Per-class probability distribution, or `None` if the backend has no
    /// probability output.
    fn predict_proba(&self, x: &[f64]) -> Result<Option<Vec<f64>>, TriageError>;
}

/// Where the active model came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSource {
    /// Persisted artifacts read from disk.
    Loaded { dir: PathBuf },
    /// Rule-derived fallback trained at startup.
    Synthesized { reason: String },
}

/// Health snapshot of the provisioned engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub source: ModelSource,
    pub classifier: String,
    pub classes: Vec<String>,
    pub n_features: usize,
    pub supports_probabilities: bool,
    /// SHA-256 (base64) of the serialized artifacts.
    pub fingerprint: String,
    pub provisioned_at: NaiveDateTime,
}
