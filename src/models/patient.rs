//! Patient input: the loosely-typed form submitted by the caller and the
//! strongly-typed feature record the engine scores.
//!
//! Coercion rules are declared once in [`FEATURE_FIELDS`]; converting a
//! [`PatientForm`] into [`PatientFeatures`] is a single pass over that table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of model input features.
pub const FEATURE_COUNT: usize = 16;

/// How a submitted value is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Finite, non-negative number. Strings are trimmed and parsed; booleans map to 1/0.
    Numeric,
    /// Free-text category, encoded later by the categorical encoders.
    Category,
}

/// One input field of the fixed feature schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Alternative keys accepted from upstream forms.
    pub aliases: &'static [&'static str],
    pub coercion: Coercion,
}

impl FieldSpec {
    const fn numeric(name: &'static str) -> Self {
        Self { name, aliases: &[], coercion: Coercion::Numeric }
    }
}

pub const AGE: FieldSpec = FieldSpec::numeric("age");
pub const GENDER: FieldSpec = FieldSpec::numeric("gender");
pub const CHEST_PAIN_TYPE: FieldSpec = FieldSpec::numeric("chest_pain_type");
pub const BLOOD_PRESSURE: FieldSpec = FieldSpec::numeric("blood_pressure");
pub const CHOLESTEROL: FieldSpec = FieldSpec::numeric("cholesterol");
pub const MAX_HEART_RATE: FieldSpec = FieldSpec::numeric("max_heart_rate");
pub const EXERCISE_ANGINA: FieldSpec = FieldSpec::numeric("exercise_angina");
pub const PLASMA_GLUCOSE: FieldSpec = FieldSpec::numeric("plasma_glucose");
pub const SKIN_THICKNESS: FieldSpec = FieldSpec::numeric("skin_thickness");
pub const INSULIN: FieldSpec = FieldSpec::numeric("insulin");
pub const BMI: FieldSpec = FieldSpec::numeric("bmi");
pub const DIABETES_PEDIGREE: FieldSpec = FieldSpec::numeric("diabetes_pedigree");
pub const HYPERTENSION: FieldSpec = FieldSpec::numeric("hypertension");
pub const HEART_DISEASE: FieldSpec = FieldSpec::numeric("heart_disease");
pub const RESIDENCE_TYPE: FieldSpec = FieldSpec {
    name: "residence_type",
    aliases: &["Residence_type"],
    coercion: Coercion::Category,
};
pub const SMOKING_STATUS: FieldSpec = FieldSpec {
    name: "smoking_status",
    aliases: &[],
    coercion: Coercion::Category,
};

/// The fixed feature schema, in model input order.
pub const FEATURE_FIELDS: [FieldSpec; FEATURE_COUNT] = [
    AGE,
    GENDER,
    CHEST_PAIN_TYPE,
    BLOOD_PRESSURE,
    CHOLESTEROL,
    MAX_HEART_RATE,
    EXERCISE_ANGINA,
    PLASMA_GLUCOSE,
    SKIN_THICKNESS,
    INSULIN,
    BMI,
    DIABETES_PEDIGREE,
    HYPERTENSION,
    HEART_DISEASE,
    RESIDENCE_TYPE,
    SMOKING_STATUS,
];

/// A field that could not be coerced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("Missing required field: {0}")]
    Missing(&'static str),

    #[error("Field {field} is not a number: {value:?}")]
    NotNumeric { field: &'static str, value: String },

    #[error("Field {field} is out of domain: {value}")]
    OutOfDomain { field: &'static str, value: f64 },
}

/// A raw submitted value: upstream forms send strings, JSON callers may send numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Null,
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Field name → raw value, as received from the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientForm(BTreeMap<String, FieldValue>);

impl PatientForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.0.remove(name)
    }

    /// Look a field up by its canonical name, then by alias.
    /// Null and blank values count as absent.
    fn lookup(&self, spec: &FieldSpec) -> Option<&FieldValue> {
        std::iter::once(spec.name)
            .chain(spec.aliases.iter().copied())
            .filter_map(|key| self.0.get(key))
            .find(|v| match v {
                FieldValue::Null => false,
                FieldValue::Text(s) => !s.trim().is_empty(),
                _ => true,
            })
    }

    fn number(&self, spec: FieldSpec) -> Result<f64, FieldError> {
        debug_assert_eq!(spec.coercion, Coercion::Numeric);
        let value = match self.lookup(&spec).ok_or(FieldError::Missing(spec.name))? {
            FieldValue::Number(n) => *n,
            FieldValue::Bool(b) => f64::from(u8::from(*b)),
            FieldValue::Text(s) => s.trim().parse::<f64>().map_err(|_| FieldError::NotNumeric {
                field: spec.name,
                value: s.clone(),
            })?,
            FieldValue::Null => return Err(FieldError::Missing(spec.name)),
        };

        if !value.is_finite() {
            return Err(FieldError::NotNumeric {
                field: spec.name,
                value: value.to_string(),
            });
        }
        if value < 0.0 {
            return Err(FieldError::OutOfDomain { field: spec.name, value });
        }
        Ok(value)
    }

    fn category(&self, spec: FieldSpec) -> Result<String, FieldError> {
        debug_assert_eq!(spec.coercion, Coercion::Category);
        match self.lookup(&spec).ok_or(FieldError::Missing(spec.name))? {
            FieldValue::Text(s) => Ok(s.trim().to_string()),
            FieldValue::Number(n) => Ok(n.to_string()),
            FieldValue::Bool(b) => Ok(b.to_string()),
            FieldValue::Null => Err(FieldError::Missing(spec.name)),
        }
    }
}

/// Typed clinical measurements for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientFeatures {
    /// Years.
    pub age: f64,
    /// 1 = male, 0 = female.
    pub gender: f64,
    /// 0 (none) to 4 (most severe).
    pub chest_pain_type: f64,
    /// Systolic, mmHg.
    pub blood_pressure: f64,
    pub cholesterol: f64,
    /// Beats per minute.
    pub max_heart_rate: f64,
    pub exercise_angina: f64,
    /// mg/dL.
    pub plasma_glucose: f64,
    pub skin_thickness: f64,
    pub insulin: f64,
    pub bmi: f64,
    pub diabetes_pedigree: f64,
    pub hypertension: f64,
    pub heart_disease: f64,
    /// e.g. "Urban" / "Rural".
    pub residence_type: String,
    /// e.g. "never smoked" / "formerly smoked" / "smokes".
    pub smoking_status: String,
}

impl PatientFeatures {
    /// Coerce a submitted form, stopping at the first malformed field.
    pub fn from_form(form: &PatientForm) -> Result<Self, FieldError> {
        Ok(Self {
            age: form.number(AGE)?,
            gender: form.number(GENDER)?,
            chest_pain_type: form.number(CHEST_PAIN_TYPE)?,
            blood_pressure: form.number(BLOOD_PRESSURE)?,
            cholesterol: form.number(CHOLESTEROL)?,
            max_heart_rate: form.number(MAX_HEART_RATE)?,
            exercise_angina: form.number(EXERCISE_ANGINA)?,
            plasma_glucose: form.number(PLASMA_GLUCOSE)?,
            skin_thickness: form.number(SKIN_THICKNESS)?,
            insulin: form.number(INSULIN)?,
            bmi: form.number(BMI)?,
            diabetes_pedigree: form.number(DIABETES_PEDIGREE)?,
            hypertension: form.number(HYPERTENSION)?,
            heart_disease: form.number(HEART_DISEASE)?,
            residence_type: form.category(RESIDENCE_TYPE)?,
            smoking_status: form.category(SMOKING_STATUS)?,
        })
    }

    /// The fourteen numeric fields, in schema order.
    pub fn numeric_values(&self) -> [f64; FEATURE_COUNT - 2] {
        [
            self.age,
            self.gender,
            self.chest_pain_type,
            self.blood_pressure,
            self.cholesterol,
            self.max_heart_rate,
            self.exercise_angina,
            self.plasma_glucose,
            self.skin_thickness,
            self.insulin,
            self.bmi,
            self.diabetes_pedigree,
            self.hypertension,
            self.heart_disease,
        ]
    }
}
