use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;
use crate::migration::Direction;

/// Initialize structured logging.
///
/// `RUST_LOG` wins when set; otherwise the configured log level applies.
/// JSON output carries the current span so workflow correlation ids end up
/// on every line. If a global subscriber is already installed it is kept.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let installed = if config.json_logs {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .try_init()
    };

    match installed {
        Ok(()) => tracing::debug!("Telemetry initialized"),
        Err(e) => tracing::debug!("Keeping existing subscriber: {}", e),
    }
    Ok(())
}

/// Generate a correlation ID for linking the steps of one workflow
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping one export or import attempt
pub fn create_migration_span(direction: Direction, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "data_migration",
        direction = direction.as_str(),
        correlation.id = correlation_id,
    )
}
