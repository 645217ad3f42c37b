//! Triage engine: model provisioning and prediction.
//!
//! A [`TriageEngine`] only exists once provisioned, so prediction can never
//! run against a missing model. The artifacts behind it are immutable and
//! shared by reference count; clones are cheap and safe to hand to any
//! number of request handlers.

pub mod artifacts;
pub mod encoder;
pub mod forest;
pub mod predict;
pub mod scaler;
pub mod synthetic;
pub mod types;

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::models::{PatientFeatures, PatientForm, TriageResult};

pub use artifacts::{provision, ModelArtifacts, ProvisionConfig};
pub use types::{Classifier, EngineStatus, ModelSource, TriageError};

/// Provisioned engine handle.
#[derive(Debug, Clone)]
pub struct TriageEngine {
    artifacts: Arc<ModelArtifacts>,
    source: ModelSource,
    provisioned_at: NaiveDateTime,
}

impl TriageEngine {
    /// Load or synthesize the model. Always succeeds.
    pub fn provision(config: &ProvisionConfig) -> Self {
        let (artifacts, source) = artifacts::provision(config);
        Self::from_artifacts(artifacts, source)
    }

    /// Wrap artifacts built elsewhere. They are validated by the caller's
    /// own provisioning path; prediction still fails safe if they are not.
    pub fn from_artifacts(artifacts: ModelArtifacts, source: ModelSource) -> Self {
        Self {
            artifacts: Arc::new(artifacts),
            source,
            provisioned_at: chrono::Local::now().naive_local(),
        }
    }

    pub fn artifacts(&self) -> &ModelArtifacts {
        &self.artifacts
    }

    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    pub fn predict(&self, features: &PatientFeatures) -> TriageResult {
        predict::predict(&self.artifacts, features)
    }

    pub fn predict_form(&self, form: &PatientForm) -> TriageResult {
        predict::predict_form(&self.artifacts, form)
    }

    /// Health snapshot for operator checks.
    pub fn status(&self) -> EngineStatus {
        let classifier = &self.artifacts.classifier;
        EngineStatus {
            source: self.source.clone(),
            classifier: classifier.kind().to_string(),
            classes: self
                .artifacts
                .label_decoder
                .classes
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
            n_features: classifier.n_features(),
            supports_probabilities: matches!(classifier, forest::ClassifierModel::RandomForest(_)),
            fingerprint: self.artifacts.fingerprint(),
            provisioned_at: self.provisioned_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::engine::artifacts::tests::shared_model;
    use crate::models::patient::tests::sample_form;
    use crate::models::TriageCategory;

    fn engine() -> TriageEngine {
        TriageEngine::from_artifacts(
            shared_model().clone(),
            ModelSource::Synthesized { reason: "test".into() },
        )
    }

    #[test]
    fn status_reports_synthesized_forest() {
        let status = engine().status();
        assert_eq!(status.classifier, "random_forest");
        assert_eq!(status.classes, vec!["green", "orange", "red", "yellow"]);
        assert_eq!(status.n_features, 16);
        assert!(status.supports_probabilities);
        assert!(matches!(status.source, ModelSource::Synthesized { .. }));
        assert!(!status.fingerprint.is_empty());
    }

    #[test]
    fn concurrent_predictions_agree() {
        let engine = engine();
        let expected = engine.predict_form(&sample_form());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                thread::spawn(move || engine.predict_form(&sample_form()))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn typed_and_form_paths_agree() {
        let engine = engine();
        let features = PatientFeatures::from_form(&sample_form()).unwrap();
        assert_eq!(engine.predict(&features), engine.predict_form(&sample_form()));
    }

    #[test]
    fn malformed_form_through_engine_is_yellow() {
        let result = engine().predict_form(&PatientForm::new());
        assert_eq!(result.category, TriageCategory::Yellow);
        assert_eq!(result, TriageResult::safe_default());
    }

    #[test]
    fn provision_from_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProvisionConfig {
            n_samples: 300,
            n_estimators: 5,
            ..artifacts::tests::test_config(dir.path())
        };
        let engine = TriageEngine::provision(&config);
        assert!(matches!(engine.source(), ModelSource::Synthesized { .. }));
        engine.artifacts().validate().unwrap();
    }
}
