use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Triage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overrides the directory the model artifacts are read from.
pub const MODEL_DIR_ENV: &str = "TRIAGE_MODEL_DIR";

/// When set to `1`/`true`, a synthesized fallback model is written back to the model dir.
pub const PERSIST_MODEL_ENV: &str = "TRIAGE_PERSIST_MODEL";

/// Persisted artifact blob names.
pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const ENCODERS_FILE: &str = "encoders.json";
pub const LABEL_DECODER_FILE: &str = "label_decoder.json";

/// Seed used for synthetic training data and forest bootstrapping.
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_SYNTHETIC_SAMPLES: usize = 1000;
pub const DEFAULT_ESTIMATORS: usize = 100;

/// Get the application data directory.
/// Falls back to the working directory on systems without a data dir.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Get the models directory, honouring `TRIAGE_MODEL_DIR`.
pub fn models_dir() -> PathBuf {
    match std::env::var_os(MODEL_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => app_data_dir().join("models"),
    }
}

/// Whether a synthesized model should be persisted for the next start.
pub fn persist_synthesized_from_env() -> bool {
    std::env::var(PERSIST_MODEL_ENV)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,triage_lib=debug"
    } else {
        "info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_dir_under_app_data_by_default() {
        if std::env::var_os(MODEL_DIR_ENV).is_some() {
            return;
        }
        let models = models_dir();
        assert!(models.starts_with(app_data_dir()));
        assert!(models.ends_with("models"));
    }

    #[test]
    fn app_data_dir_named_after_app() {
        assert!(app_data_dir().ends_with(APP_NAME));
    }

    #[test]
    fn artifact_files_are_distinct() {
        let names = [CLASSIFIER_FILE, SCALER_FILE, ENCODERS_FILE, LABEL_DECODER_FILE];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
