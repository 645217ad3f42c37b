pub mod batch;
pub mod config;
pub mod engine;
pub mod guidance;
pub mod models;
pub mod queue;

use tracing_subscriber::EnvFilter;

pub use engine::{EngineStatus, ModelArtifacts, ModelSource, ProvisionConfig, TriageEngine};
pub use models::{PatientFeatures, PatientForm, TriageCategory, TriageResult};

/// Batch entry point: provision once, then score JSON patient forms from
/// stdin to stdout, one per line.
pub fn run() {
    // Logs go to stderr; stdout carries results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let engine = TriageEngine::provision(&ProvisionConfig::from_env());
    let status = engine.status();
    tracing::info!(
        classifier = %status.classifier,
        fingerprint = %status.fingerprint,
        "Triage engine ready"
    );

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    match batch::score_lines(&engine, stdin.lock(), stdout.lock()) {
        Ok(n) => tracing::info!(scored = n, "Batch complete"),
        Err(e) => tracing::error!(error = %e, "Batch scoring aborted"),
    }
}
