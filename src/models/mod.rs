pub mod enums;
pub mod patient;
pub mod result;

pub use enums::{InvalidEnum, TriageCategory, TriageStatus};
pub use patient::{FieldError, FieldValue, PatientFeatures, PatientForm, FEATURE_COUNT};
pub use result::{format_percent, Probabilities, TriageResult};
