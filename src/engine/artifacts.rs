//! Model provisioning: load persisted artifacts, or synthesize the
//! rule-derived fallback model.

use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config;
use crate::models::{TriageCategory, FEATURE_COUNT};

use super::encoder::{CategoricalEncoders, LabelDecoder};
use super::forest::{ClassifierModel, DecisionTree, ForestParams, Node, RandomForest};
use super::scaler::StandardScaler;
use super::synthetic::SyntheticDataset;
use super::types::{Classifier, ModelSource, TriageError};

/// Provisioning settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionConfig {
    /// Directory holding the four artifact blobs.
    pub model_dir: PathBuf,
    pub seed: u64,
    pub n_samples: usize,
    pub n_estimators: usize,
    /// Write a synthesized model back to `model_dir`.
    pub persist_synthesized: bool,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            model_dir: config::models_dir(),
            seed: config::DEFAULT_SEED,
            n_samples: config::DEFAULT_SYNTHETIC_SAMPLES,
            n_estimators: config::DEFAULT_ESTIMATORS,
            persist_synthesized: false,
        }
    }
}

impl ProvisionConfig {
    /// Defaults plus environment overrides (`TRIAGE_MODEL_DIR`, `TRIAGE_PERSIST_MODEL`).
    pub fn from_env() -> Self {
        Self {
            persist_synthesized: config::persist_synthesized_from_env(),
            ..Self::default()
        }
    }

    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }
}

/// Classifier plus the preprocessing it was trained with. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifacts {
    pub classifier: ClassifierModel,
    pub scaler: StandardScaler,
    pub encoders: CategoricalEncoders,
    pub label_decoder: LabelDecoder,
}

impl ModelArtifacts {
    /// Read and validate the four persisted blobs.
    pub fn load(dir: &Path) -> Result<Self, TriageError> {
        let artifacts = Self {
            classifier: read_blob(dir, config::CLASSIFIER_FILE)?,
            scaler: read_blob(dir, config::SCALER_FILE)?,
            encoders: read_blob(dir, config::ENCODERS_FILE)?,
            label_decoder: read_blob(dir, config::LABEL_DECODER_FILE)?,
        };
        artifacts.validate()?;
        Ok(artifacts)
    }

    /// Write the four blobs, each atomically.
    pub fn save(&self, dir: &Path) -> Result<(), TriageError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| TriageError::Persist(format!("{}: {e}", dir.display())))?;
        write_blob(dir, config::CLASSIFIER_FILE, &self.classifier)?;
        write_blob(dir, config::SCALER_FILE, &self.scaler)?;
        write_blob(dir, config::ENCODERS_FILE, &self.encoders)?;
        write_blob(dir, config::LABEL_DECODER_FILE, &self.label_decoder)?;
        tracing::info!(dir = %dir.display(), "Model artifacts persisted");
        Ok(())
    }

    /// A set is usable only if every piece agrees on width and classes.
    pub fn validate(&self) -> Result<(), TriageError> {
        self.scaler.validate()?;
        self.label_decoder.validate()?;
        self.classifier.validate()?;

        if self.scaler.n_features() != FEATURE_COUNT {
            return Err(TriageError::ArtifactInconsistent(format!(
                "scaler expects {} features, schema has {FEATURE_COUNT}",
                self.scaler.n_features()
            )));
        }
        if self.classifier.n_features() != FEATURE_COUNT {
            return Err(TriageError::ArtifactInconsistent(format!(
                "classifier expects {} features, schema has {FEATURE_COUNT}",
                self.classifier.n_features()
            )));
        }
        if self.classifier.n_classes() != self.label_decoder.len() {
            return Err(TriageError::ArtifactInconsistent(format!(
                "classifier has {} classes, label decoder has {}",
                self.classifier.n_classes(),
                self.label_decoder.len()
            )));
        }
        Ok(())
    }

    /// Train the rule-derived fallback model on reproducible synthetic data.
    pub fn synthesize(config: &ProvisionConfig) -> Result<Self, TriageError> {
        let data = SyntheticDataset::generate(config.n_samples, config.seed)?;

        let scaler = StandardScaler::fit(&data.rows)?;
        let scaled = data
            .rows
            .iter()
            .map(|r| scaler.transform(r))
            .collect::<Result<Vec<_>, _>>()?;

        let label_decoder = LabelDecoder::fit(&data.labels)?;
        let y = data
            .labels
            .iter()
            .map(|l| label_decoder.transform(*l))
            .collect::<Result<Vec<_>, _>>()?;

        let forest = RandomForest::fit(
            &scaled,
            &y,
            label_decoder.len(),
            ForestParams {
                n_estimators: config.n_estimators,
                seed: config.seed,
                ..ForestParams::default()
            },
        )?;

        tracing::debug!(
            samples = data.len(),
            classes = label_decoder.len(),
            trees = forest.trees.len(),
            "Synthetic triage model trained"
        );

        Ok(Self {
            classifier: ClassifierModel::RandomForest(forest),
            scaler,
            encoders: CategoricalEncoders::default(),
            label_decoder,
        })
    }

    /// Last-resort model that always predicts the safe-default distribution.
    /// Used only if synthesis itself fails.
    pub fn prior() -> Self {
        let label_decoder = LabelDecoder {
            classes: vec![
                TriageCategory::Green,
                TriageCategory::Orange,
                TriageCategory::Red,
                TriageCategory::Yellow,
            ],
        };
        let forest = RandomForest {
            n_features: FEATURE_COUNT,
            n_classes: 4,
            trees: vec![DecisionTree {
                nodes: vec![Node::Leaf { proba: vec![0.3, 0.2, 0.1, 0.4] }],
            }],
        };
        Self {
            classifier: ClassifierModel::RandomForest(forest),
            scaler: StandardScaler {
                mean: vec![0.0; FEATURE_COUNT],
                scale: vec![1.0; FEATURE_COUNT],
            },
            encoders: CategoricalEncoders::default(),
            label_decoder,
        }
    }

    /// SHA-256 over the serialized blobs, base64-encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for blob in [
            serde_json::to_vec(&self.classifier),
            serde_json::to_vec(&self.scaler),
            serde_json::to_vec(&self.encoders),
            serde_json::to_vec(&self.label_decoder),
        ] {
            // Serializing plain data structs cannot fail; hash what we have
            hasher.update(blob.unwrap_or_default());
        }
        base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
    }
}

/// Load persisted artifacts, or synthesize a fallback. Never fails.
pub fn provision(config: &ProvisionConfig) -> (ModelArtifacts, ModelSource) {
    let reason = match ModelArtifacts::load(&config.model_dir) {
        Ok(artifacts) => {
            tracing::info!(
                dir = %config.model_dir.display(),
                classifier = artifacts.classifier.kind(),
                "Triage model loaded from artifacts"
            );
            return (
                artifacts,
                ModelSource::Loaded { dir: config.model_dir.clone() },
            );
        }
        Err(e @ TriageError::ArtifactMissing(_)) => {
            tracing::info!(error = %e, "Model artifacts not found, building rule-based model");
            e.to_string()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Model artifacts unusable, building rule-based model");
            e.to_string()
        }
    };

    let artifacts = match ModelArtifacts::synthesize(config) {
        Ok(artifacts) => artifacts,
        Err(e) => {
            tracing::error!(error = %e, "Synthetic model training failed, using prior model");
            ModelArtifacts::prior()
        }
    };

    if config.persist_synthesized {
        if let Err(e) = artifacts.save(&config.model_dir) {
            tracing::warn!(error = %e, "Could not persist synthesized model");
        }
    }

    tracing::info!(
        classifier = artifacts.classifier.kind(),
        classes = artifacts.label_decoder.len(),
        "Rule-based triage model ready"
    );
    (artifacts, ModelSource::Synthesized { reason })
}

fn read_blob<T: DeserializeOwned>(dir: &Path, name: &'static str) -> Result<T, TriageError> {
    let path = dir.join(name);
    if !path.is_file() {
        return Err(TriageError::ArtifactMissing(path));
    }
    let json = std::fs::read_to_string(&path)
        .map_err(|e| TriageError::ArtifactRead(path.clone(), e.to_string()))?;
    serde_json::from_str(&json).map_err(|e| TriageError::ArtifactParse(name, e.to_string()))
}

fn write_blob<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<(), TriageError> {
    let bytes = serde_json::to_vec(value).map_err(|e| TriageError::Persist(e.to_string()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| TriageError::Persist(format!("{}: {e}", dir.display())))?;
    tmp.write_all(&bytes)
        .map_err(|e| TriageError::Persist(format!("{name}: {e}")))?;
    tmp.persist(dir.join(name))
        .map_err(|e| TriageError::Persist(format!("{name}: {e}")))?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::OnceLock;

    use super::*;

    /// Smaller than production so the suite stays fast; same code path.
    pub(crate) fn test_config(dir: &Path) -> ProvisionConfig {
        ProvisionConfig {
            model_dir: dir.to_path_buf(),
            seed: 42,
            n_samples: 1000,
            n_estimators: 30,
            persist_synthesized: false,
        }
    }

    /// Synthetic model trained once per test binary.
    pub(crate) fn shared_model() -> &'static ModelArtifacts {
        static MODEL: OnceLock<ModelArtifacts> = OnceLock::new();
        MODEL.get_or_init(|| {
            ModelArtifacts::synthesize(&test_config(Path::new("unused"))).unwrap()
        })
    }

    #[test]
    fn synthesized_model_is_valid() {
        let model = shared_model();
        model.validate().unwrap();
        assert_eq!(model.classifier.kind(), "random_forest");
        assert_eq!(model.label_decoder.len(), 4);
        assert_eq!(model.scaler.n_features(), FEATURE_COUNT);
    }

    #[test]
    fn synthesis_is_reproducible() {
        let config = ProvisionConfig { n_samples: 300, n_estimators: 5, ..test_config(Path::new("x")) };
        let a = ModelArtifacts::synthesize(&config).unwrap();
        let b = ModelArtifacts::synthesize(&config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn missing_dir_synthesizes() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProvisionConfig {
            n_samples: 300,
            n_estimators: 5,
            ..test_config(&dir.path().join("absent"))
        };
        let (artifacts, source) = provision(&config);
        artifacts.validate().unwrap();
        assert!(matches!(source, ModelSource::Synthesized { .. }));
        assert!(!dir.path().join("absent").exists(), "nothing persisted by default");
    }

    #[test]
    fn save_then_load_returns_identical_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let model = shared_model();
        model.save(dir.path()).unwrap();

        for name in [
            config::CLASSIFIER_FILE,
            config::SCALER_FILE,
            config::ENCODERS_FILE,
            config::LABEL_DECODER_FILE,
        ] {
            assert!(dir.path().join(name).is_file(), "{name} not written");
        }

        let (loaded, source) = provision(&test_config(dir.path()));
        assert_eq!(&loaded, model);
        assert_eq!(source, ModelSource::Loaded { dir: dir.path().to_path_buf() });
    }

    #[test]
    fn incomplete_set_falls_back_to_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        shared_model().save(dir.path()).unwrap();
        std::fs::remove_file(dir.path().join(config::ENCODERS_FILE)).unwrap();

        assert!(matches!(
            ModelArtifacts::load(dir.path()),
            Err(TriageError::ArtifactMissing(_))
        ));
        let config = ProvisionConfig { n_samples: 300, n_estimators: 5, ..test_config(dir.path()) };
        let (_, source) = provision(&config);
        assert!(matches!(source, ModelSource::Synthesized { .. }));
    }

    #[test]
    fn corrupt_blob_falls_back_to_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        shared_model().save(dir.path()).unwrap();
        std::fs::write(dir.path().join(config::CLASSIFIER_FILE), b"{not json").unwrap();

        assert!(matches!(
            ModelArtifacts::load(dir.path()),
            Err(TriageError::ArtifactParse("classifier.json", _))
        ));
        let config = ProvisionConfig { n_samples: 300, n_estimators: 5, ..test_config(dir.path()) };
        let (artifacts, source) = provision(&config);
        artifacts.validate().unwrap();
        match source {
            ModelSource::Synthesized { reason } => assert!(reason.contains("classifier.json")),
            other => panic!("expected synthesis, got {other:?}"),
        }
    }

    #[test]
    fn inconsistent_scaler_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = shared_model().clone();
        model.scaler = StandardScaler { mean: vec![0.0; 3], scale: vec![1.0; 3] };
        model.save(dir.path()).unwrap();
        assert!(matches!(
            ModelArtifacts::load(dir.path()),
            Err(TriageError::ArtifactInconsistent(_))
        ));
    }

    #[test]
    fn unnormalized_forest_falls_back_to_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = shared_model().clone();
        model.classifier = ClassifierModel::RandomForest(RandomForest {
            n_features: FEATURE_COUNT,
            n_classes: 4,
            trees: vec![DecisionTree { nodes: vec![Node::Leaf { proba: vec![0.9; 4] }] }],
        });
        model.save(dir.path()).unwrap();

        assert!(matches!(
            ModelArtifacts::load(dir.path()),
            Err(TriageError::ArtifactInconsistent(_))
        ));
        let config = ProvisionConfig { n_samples: 300, n_estimators: 5, ..test_config(dir.path()) };
        let (artifacts, source) = provision(&config);
        assert!(matches!(source, ModelSource::Synthesized { .. }));
        assert_ne!(artifacts, model);
    }

    #[test]
    fn class_count_mismatch_is_rejected() {
        let mut model = shared_model().clone();
        model.label_decoder.classes.pop();
        assert!(model.validate().is_err());
    }

    #[test]
    fn persist_synthesized_writes_loadable_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProvisionConfig {
            n_samples: 300,
            n_estimators: 5,
            persist_synthesized: true,
            ..test_config(dir.path())
        };
        let (first, source) = provision(&config);
        assert!(matches!(source, ModelSource::Synthesized { .. }));

        let (second, source) = provision(&config);
        assert!(matches!(source, ModelSource::Loaded { .. }));
        assert_eq!(first, second);
    }

    #[test]
    fn bad_synthesis_config_uses_prior() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProvisionConfig { n_samples: 0, ..test_config(dir.path()) };
        let (artifacts, _) = provision(&config);
        assert_eq!(artifacts, ModelArtifacts::prior());
        artifacts.validate().unwrap();
    }

    #[test]
    fn fingerprint_changes_with_model() {
        let a = ModelArtifacts::prior();
        let mut b = ModelArtifacts::prior();
        b.scaler.mean[0] = 1.0;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
