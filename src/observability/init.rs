//! Observability initialization at startup

use anyhow::Result;

use super::recorder::{MetricsConfig, init_metrics};
use crate::config::AppConfig;
use crate::logging::setup_tracing;

/// Install the tracing subscriber and, if enabled, the metrics recorder
pub fn init_observability(config: &AppConfig) -> Result<()> {
    setup_tracing(&config.logging)?;

    if config.metrics.enabled {
        init_metrics(MetricsConfig {
            environment: config.environment.as_str().to_string(),
            ip_allowlist: config.metrics.ip_allowlist.clone(),
        })?;
    }

    tracing::info!(
        environment = config.environment.as_str(),
        log_format = %config.logging.format,
        metrics = config.metrics.enabled,
        "Observability components initialized"
    );
    Ok(())
}
