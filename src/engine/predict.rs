//! Prediction: patient features → triage result.
//!
//! `predict` and `predict_form` are total. Every internal failure (bad input,
//! width mismatch, malformed model) is logged and answered with
//! [`TriageResult::safe_default`], never with an error or a green result.

use crate::models::{
    format_percent, PatientFeatures, PatientForm, Probabilities, TriageCategory, TriageResult,
};

use super::artifacts::ModelArtifacts;
use super::encoder::LabelDecoder;
use super::types::{Classifier, TriageError};

/// Points given to the predicted class when the classifier has no probability output.
const PREDICTED_POINTS: f64 = 70.0;

fn baseline_points(category: TriageCategory) -> f64 {
    match category {
        TriageCategory::Red => 10.0,
        TriageCategory::Orange => 20.0,
        TriageCategory::Yellow => 30.0,
        TriageCategory::Green => 40.0,
    }
}

/// Score a typed patient record.
pub fn predict(artifacts: &ModelArtifacts, features: &PatientFeatures) -> TriageResult {
    match try_predict(artifacts, features) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "Triage prediction failed, returning safe default");
            TriageResult::safe_default()
        }
    }
}

/// Coerce a submitted form and score it.
pub fn predict_form(artifacts: &ModelArtifacts, form: &PatientForm) -> TriageResult {
    match PatientFeatures::from_form(form) {
        Ok(features) => predict(artifacts, &features),
        Err(e) => {
            tracing::warn!(error = %e, "Patient form rejected, returning safe default");
            TriageResult::safe_default()
        }
    }
}

/// Fallible core of [`predict`].
pub fn try_predict(
    artifacts: &ModelArtifacts,
    features: &PatientFeatures,
) -> Result<TriageResult, TriageError> {
    let x = artifacts.encoders.encode(features);
    let z = artifacts.scaler.transform(&x)?;

    let index = artifacts.classifier.predict(&z)?;
    let category = artifacts.label_decoder.inverse_transform(index)?;

    let probabilities = match artifacts.classifier.predict_proba(&z)? {
        Some(proba) => decode_distribution(&artifacts.label_decoder, &proba)?,
        None => fallback_distribution(category),
    };

    tracing::debug!(category = %category, "Patient triaged");
    Ok(TriageResult::new(category, probabilities))
}

/// Map a per-class distribution onto all four categories.
/// Categories the model never learned get 0.0%.
fn decode_distribution(
    decoder: &LabelDecoder,
    proba: &[f64],
) -> Result<Probabilities, TriageError> {
    if proba.len() != decoder.len() {
        return Err(TriageError::Inference(format!(
            "distribution has {} classes, decoder has {}",
            proba.len(),
            decoder.len()
        )));
    }
    if proba.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(TriageError::Inference("invalid class probability".into()));
    }

    let mut out: Probabilities = TriageCategory::ALL
        .iter()
        .map(|c| (*c, format_percent(0.0)))
        .collect();
    for (index, p) in proba.iter().enumerate() {
        let category = decoder.inverse_transform(index)?;
        out.insert(category, format_percent(p * 100.0));
    }
    Ok(out)
}

/// Fixed distribution for classifiers without probability output:
/// predicted class 70 points, others their baseline, normalized to 100.
pub fn fallback_distribution(predicted: TriageCategory) -> Probabilities {
    let points = |c: TriageCategory| {
        if c == predicted { PREDICTED_POINTS } else { baseline_points(c) }
    };
    let total: f64 = TriageCategory::ALL.iter().map(|c| points(*c)).sum();
    TriageCategory::ALL
        .iter()
        .map(|c| (*c, format_percent(points(*c) / total * 100.0)))
        .collect()
}
