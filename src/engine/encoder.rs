use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{PatientFeatures, TriageCategory, FEATURE_COUNT};

use super::types::TriageError;

/// One categorical column: exact label → code, with a code for anything unlisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCodes {
    pub codes: BTreeMap<String, f64>,
    pub default: f64,
}

impl CategoryCodes {
    pub fn encode(&self, label: &str) -> f64 {
        self.codes.get(label).copied().unwrap_or(self.default)
    }
}

/// Encoders for the two free-text patient fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalEncoders {
    pub residence_type: CategoryCodes,
    pub smoking_status: CategoryCodes,
}

impl Default for CategoricalEncoders {
    fn default() -> Self {
        Self {
            residence_type: CategoryCodes {
                codes: BTreeMap::from([("Urban".to_string(), 1.0)]),
                default: 0.0,
            },
            smoking_status: CategoryCodes {
                codes: BTreeMap::from([
                    ("never smoked".to_string(), 0.0),
                    ("formerly smoked".to_string(), 1.0),
                    ("smokes".to_string(), 2.0),
                ]),
                default: 0.0,
            },
        }
    }
}

impl CategoricalEncoders {
    /// Assemble the model input vector in schema order.
    pub fn encode(&self, features: &PatientFeatures) -> Vec<f64> {
        let mut x = Vec::with_capacity(FEATURE_COUNT);
        x.extend_from_slice(&features.numeric_values());
        x.push(self.residence_type.encode(&features.residence_type));
        x.push(self.smoking_status.encode(&features.smoking_status));
        x
    }
}

/// Maps encoded class indices back to triage categories.
///
/// Classes are kept sorted by label text, so index assignment matches a
/// conventional string label encoder (green, orange, red, yellow).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDecoder {
    pub classes: Vec<TriageCategory>,
}

impl LabelDecoder {
    pub fn fit(labels: &[TriageCategory]) -> Result<Self, TriageError> {
        let mut classes: Vec<TriageCategory> = labels.to_vec();
        classes.sort_by_key(|c| c.as_str());
        classes.dedup();
        if classes.is_empty() {
            return Err(TriageError::Training("no labels to fit".into()));
        }
        Ok(Self { classes })
    }

    pub fn transform(&self, label: TriageCategory) -> Result<usize, TriageError> {
        self.classes
            .iter()
            .position(|c| *c == label)
            .ok_or_else(|| TriageError::Training(format!("label {label} was not fitted")))
    }

    pub fn inverse_transform(&self, index: usize) -> Result<TriageCategory, TriageError> {
        self.classes.get(index).copied().ok_or(TriageError::UnknownClass(index))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<(), TriageError> {
        if self.classes.is_empty() {
            return Err(TriageError::ArtifactInconsistent("label decoder has no classes".into()));
        }
        let mut seen = self.classes.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != self.classes.len() {
            return Err(TriageError::ArtifactInconsistent(
                "label decoder has duplicate classes".into(),
            ));
        }
        Ok(())
    }
}
