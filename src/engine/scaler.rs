use serde::{Deserialize, Serialize};

use super::types::TriageError;

/// Zero-mean / unit-variance standardization with training-time statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    /// Population standard deviation; constant columns are stored as 1.0.
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit per-column statistics over a row-major sample matrix.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, TriageError> {
        let width = rows
            .first()
            .map(Vec::len)
            .ok_or_else(|| TriageError::Training("no rows to fit scaler".into()))?;
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(TriageError::FeatureCount { expected: width, got: bad.len() });
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; width];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *acc += (v - m).powi(2);
            }
        }
        let scale = var
            .into_iter()
            .map(|v| {
                let sd = (v / n).sqrt();
                if sd > f64::EPSILON { sd } else { 1.0 }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardize one feature vector.
    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>, TriageError> {
        if x.len() != self.mean.len() {
            return Err(TriageError::FeatureCount { expected: self.mean.len(), got: x.len() });
        }
        Ok(x.iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((v, m), s)| (v - m) / s)
            .collect())
    }

    pub(crate) fn validate(&self) -> Result<(), TriageError> {
        if self.mean.len() != self.scale.len() {
            return Err(TriageError::ArtifactInconsistent(format!(
                "scaler mean has {} entries but scale has {}",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s <= 0.0)
            || self.mean.iter().any(|m| !m.is_finite())
        {
            return Err(TriageError::ArtifactInconsistent(
                "scaler statistics must be finite with positive scale".into(),
            ));
        }
        Ok(())
    }
}
