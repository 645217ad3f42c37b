//! Rule-labelled synthetic training data for the fallback model.
//!
//! Each feature is sampled independently from a clinically plausible
//! distribution under a fixed seed; each row is labelled by the additive
//! severity rules in [`severity_score`].

use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::Normal;

use crate::models::{TriageCategory, FEATURE_COUNT};

use super::types::TriageError;

/// Column positions in the model input vector.
pub mod idx {
    pub const AGE: usize = 0;
    pub const CHEST_PAIN_TYPE: usize = 2;
    pub const BLOOD_PRESSURE: usize = 3;
    pub const MAX_HEART_RATE: usize = 5;
    pub const EXERCISE_ANGINA: usize = 6;
    pub const PLASMA_GLUCOSE: usize = 7;
    pub const BMI: usize = 10;
    pub const HYPERTENSION: usize = 12;
    pub const HEART_DISEASE: usize = 13;
    pub const SMOKING_STATUS: usize = 15;
}

#[derive(Debug, Clone, Copy)]
enum Sampler {
    /// Normal(mean, sd) clipped to [lo, hi], optionally truncated to an integer.
    Normal { mean: f64, sd: f64, lo: f64, hi: f64, integer: bool },
    /// Uniform over the codes 0..n.
    Choice(u32),
    /// Uniform over [lo, hi).
    Uniform { lo: f64, hi: f64 },
}

const fn normal_int(mean: f64, sd: f64, lo: f64, hi: f64) -> Sampler {
    Sampler::Normal { mean, sd, lo, hi, integer: true }
}

const fn normal(mean: f64, sd: f64, lo: f64, hi: f64) -> Sampler {
    Sampler::Normal { mean, sd, lo, hi, integer: false }
}

/// One sampler per feature, in schema order.
const SAMPLERS: [Sampler; FEATURE_COUNT] = [
    normal_int(50.0, 15.0, 18.0, 90.0),   // age
    Sampler::Choice(2),                   // gender
    Sampler::Choice(5),                   // chest_pain_type
    normal_int(130.0, 20.0, 80.0, 200.0), // blood_pressure
    normal_int(240.0, 50.0, 150.0, 400.0), // cholesterol
    normal_int(150.0, 30.0, 60.0, 220.0), // max_heart_rate
    Sampler::Choice(2),                   // exercise_angina
    normal(100.0, 30.0, 50.0, 300.0),     // plasma_glucose
    normal(25.0, 10.0, 5.0, 50.0),        // skin_thickness
    normal(80.0, 40.0, 10.0, 200.0),      // insulin
    normal(26.0, 5.0, 15.0, 40.0),        // bmi
    Sampler::Uniform { lo: 0.1, hi: 2.0 }, // diabetes_pedigree
    Sampler::Choice(2),                   // hypertension
    Sampler::Choice(2),                   // heart_disease
    Sampler::Choice(2),                   // residence_urban
    Sampler::Choice(3),                   // smoking_status
];

impl Sampler {
    /// Draw `n` values for one column.
    fn column(self, n: usize, rng: &mut StdRng) -> Result<Vec<f64>, TriageError> {
        match self {
            Sampler::Normal { mean, sd, lo, hi, integer } => {
                let dist = Normal::new(mean, sd)
                    .map_err(|e| TriageError::Training(format!("normal({mean}, {sd}): {e}")))?;
                Ok((0..n)
                    .map(|_| {
                        let v = dist.sample(rng).clamp(lo, hi);
                        if integer { v.trunc() } else { v }
                    })
                    .collect())
            }
            Sampler::Choice(k) => Ok((0..n).map(|_| f64::from(rng.gen_range(0..k))).collect()),
            Sampler::Uniform { lo, hi } => Ok((0..n).map(|_| rng.gen_range(lo..hi)).collect()),
        }
    }
}

/// Additive clinical severity points for one encoded feature vector.
///
/// Age >70: +2, >60: +1. Chest pain type ≥3: +3, ≥2: +2.
/// Blood pressure >180 or <90: +3, >160 or <100: +2.
/// Max heart rate >200 or <60: +2, >180 or <80: +1.
/// Exercise angina: +2. Heart disease: +2. Hypertension: +1.
/// Glucose >180: +1. BMI >35: +1. Current smoker (code 2): +1.
pub fn severity_score(x: &[f64]) -> Result<u32, TriageError> {
    if x.len() != FEATURE_COUNT {
        return Err(TriageError::FeatureCount { expected: FEATURE_COUNT, got: x.len() });
    }
    let mut score = 0;

    let age = x[idx::AGE];
    if age > 70.0 {
        score += 2;
    } else if age > 60.0 {
        score += 1;
    }

    let chest_pain = x[idx::CHEST_PAIN_TYPE];
    if chest_pain >= 3.0 {
        score += 3;
    } else if chest_pain >= 2.0 {
        score += 2;
    }

    let bp = x[idx::BLOOD_PRESSURE];
    if bp > 180.0 || bp < 90.0 {
        score += 3;
    } else if bp > 160.0 || bp < 100.0 {
        score += 2;
    }

    let hr = x[idx::MAX_HEART_RATE];
    if hr > 200.0 || hr < 60.0 {
        score += 2;
    } else if hr > 180.0 || hr < 80.0 {
        score += 1;
    }

    if x[idx::EXERCISE_ANGINA] == 1.0 {
        score += 2;
    }
    if x[idx::HEART_DISEASE] == 1.0 {
        score += 2;
    }
    if x[idx::HYPERTENSION] == 1.0 {
        score += 1;
    }
    if x[idx::PLASMA_GLUCOSE] > 180.0 {
        score += 1;
    }
    if x[idx::BMI] > 35.0 {
        score += 1;
    }
    if x[idx::SMOKING_STATUS] == 2.0 {
        score += 1;
    }

    Ok(score)
}

/// Rule-based ground-truth category for one encoded feature vector.
pub fn rule_category(x: &[f64]) -> Result<TriageCategory, TriageError> {
    severity_score(x).map(TriageCategory::from_severity_score)
}

/// Synthetic rows and their rule labels.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticDataset {
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<TriageCategory>,
}

impl SyntheticDataset {
    /// Sample `n` rows column by column under `seed`, then label them.
    pub fn generate(n: usize, seed: u64) -> Result<Self, TriageError> {
        if n == 0 {
            return Err(TriageError::Training("synthetic sample count must be positive".into()));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let columns = SAMPLERS
            .iter()
            .map(|s| s.column(n, &mut rng))
            .collect::<Result<Vec<_>, _>>()?;

        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| columns.iter().map(|col| col[i]).collect())
            .collect();
        let labels = rows
            .iter()
            .map(|r| rule_category(r))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rows, labels })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calm_patient() -> Vec<f64> {
        // age, gender, cp, bp, chol, hr, angina, glucose, skin, insulin, bmi, pedigree,
        // hypertension, heart_disease, urban, smoking
        vec![
            40.0, 0.0, 0.0, 120.0, 200.0, 140.0, 0.0, 90.0, 20.0, 80.0, 24.0, 0.5, 0.0, 0.0, 1.0,
            0.0,
        ]
    }

    #[test]
    fn calm_patient_scores_zero() {
        assert_eq!(severity_score(&calm_patient()).unwrap(), 0);
        assert_eq!(rule_category(&calm_patient()).unwrap(), TriageCategory::Green);
    }

    #[test]
    fn worst_case_scores_eighteen() {
        let x = vec![
            75.0, 1.0, 4.0, 190.0, 240.0, 205.0, 1.0, 190.0, 25.0, 80.0, 36.0, 0.5, 1.0, 1.0, 1.0,
            2.0,
        ];
        assert_eq!(severity_score(&x).unwrap(), 18);
        assert_eq!(rule_category(&x).unwrap(), TriageCategory::Red);
    }

    #[test]
    fn thresholds_are_strict_where_documented() {
        let mut x = calm_patient();
        x[idx::AGE] = 70.0;
        assert_eq!(severity_score(&x).unwrap(), 1, "age 70 is only >60");
        x[idx::AGE] = 60.0;
        assert_eq!(severity_score(&x).unwrap(), 0);

        let mut x = calm_patient();
        x[idx::BLOOD_PRESSURE] = 180.0;
        assert_eq!(severity_score(&x).unwrap(), 2);
        x[idx::BLOOD_PRESSURE] = 89.0;
        assert_eq!(severity_score(&x).unwrap(), 3);
        x[idx::BLOOD_PRESSURE] = 95.0;
        assert_eq!(severity_score(&x).unwrap(), 2);

        let mut x = calm_patient();
        x[idx::MAX_HEART_RATE] = 60.0;
        assert_eq!(severity_score(&x).unwrap(), 1, "60 bpm is only <80");
        x[idx::MAX_HEART_RATE] = 59.0;
        assert_eq!(severity_score(&x).unwrap(), 2);

        let mut x = calm_patient();
        x[idx::CHEST_PAIN_TYPE] = 2.0;
        assert_eq!(severity_score(&x).unwrap(), 2);
        x[idx::CHEST_PAIN_TYPE] = 3.0;
        assert_eq!(severity_score(&x).unwrap(), 3);
    }

    #[test]
    fn category_boundaries() {
        // angina(2) + heart disease(2) + hypertension(1) = 5 → orange
        let mut x = calm_patient();
        x[idx::EXERCISE_ANGINA] = 1.0;
        x[idx::HEART_DISEASE] = 1.0;
        x[idx::HYPERTENSION] = 1.0;
        assert_eq!(rule_category(&x).unwrap(), TriageCategory::Orange);

        // + chest pain ≥3 (3) = 8 → red
        x[idx::CHEST_PAIN_TYPE] = 3.0;
        assert_eq!(rule_category(&x).unwrap(), TriageCategory::Red);

        // smoker alone = 1 → green
        let mut x = calm_patient();
        x[idx::SMOKING_STATUS] = 2.0;
        assert_eq!(rule_category(&x).unwrap(), TriageCategory::Green);
    }

    #[test]
    fn wrong_width_is_rejected() {
        assert!(severity_score(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn generation_is_reproducible_under_seed() {
        let a = SyntheticDataset::generate(200, 42).unwrap();
        let b = SyntheticDataset::generate(200, 42).unwrap();
        assert_eq!(a, b);
        let c = SyntheticDataset::generate(200, 43).unwrap();
        assert_ne!(a.rows, c.rows);
    }

    #[test]
    fn samples_respect_clip_ranges_and_codes() {
        let data = SyntheticDataset::generate(1000, 42).unwrap();
        assert_eq!(data.len(), 1000);
        for row in &data.rows {
            assert_eq!(row.len(), FEATURE_COUNT);
            assert!((18.0..=90.0).contains(&row[idx::AGE]));
            assert_eq!(row[idx::AGE].fract(), 0.0);
            assert!((80.0..=200.0).contains(&row[idx::BLOOD_PRESSURE]));
            assert!((60.0..=220.0).contains(&row[idx::MAX_HEART_RATE]));
            assert!((15.0..=40.0).contains(&row[idx::BMI]));
            assert!((0.1..2.0).contains(&row[11]));
            assert!([0.0, 1.0, 2.0, 3.0, 4.0].contains(&row[idx::CHEST_PAIN_TYPE]));
            assert!([0.0, 1.0, 2.0].contains(&row[idx::SMOKING_STATUS]));
        }
    }

    #[test]
    fn labels_match_rules_and_cover_all_categories() {
        let data = SyntheticDataset::generate(1000, 42).unwrap();
        for (row, label) in data.rows.iter().zip(&data.labels) {
            assert_eq!(rule_category(row).unwrap(), *label);
        }
        for cat in TriageCategory::ALL {
            assert!(data.labels.contains(&cat), "no {cat} samples in 1000 rows");
        }
    }

    #[test]
    fn invalid_normal_parameters_are_a_training_error() {
        let mut rng = StdRng::seed_from_u64(42);
        let bad = normal(50.0, -1.0, 0.0, 100.0);
        assert!(matches!(bad.column(10, &mut rng), Err(TriageError::Training(_))));
    }

    #[test]
    fn zero_samples_is_an_error() {
        assert!(SyntheticDataset::generate(0, 42).is_err());
    }
}
