//! Prometheus recorder and access control for the metrics endpoint
//!
//! Metrics are rendered through the sidecar's own `/metrics` route rather
//! than a separate exporter listener, so the recorder is installed without
//! an HTTP listener.

use anyhow::{Result, anyhow};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Service environment (development, staging, production)
    pub environment: String,
    /// Optional IP allowlist for metrics endpoint access
    pub ip_allowlist: Option<Vec<String>>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            ip_allowlist: None,
        }
    }
}

pub struct MetricsManager {
    handle: PrometheusHandle,
    config: MetricsConfig,
}

impl MetricsManager {
    /// Install the global Prometheus recorder
    pub fn new(config: MetricsConfig) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .add_global_label("service", env!("CARGO_PKG_NAME"))
            .add_global_label("environment", &config.environment)
            .add_global_label("version", env!("CARGO_PKG_VERSION"))
            .install_recorder()
            .map_err(|e| anyhow!("Failed to install Prometheus recorder: {}", e))?;

        tracing::info!(
            environment = %config.environment,
            allowlist = config.ip_allowlist.is_some(),
            "Prometheus metrics recorder initialized"
        );

        Ok(Self { handle, config })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    pub fn is_ip_allowed(&self, ip: &str) -> bool {
        match &self.config.ip_allowlist {
            Some(allowlist) => allowlist.iter().any(|allowed| allowed == ip),
            None => true,
        }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }
}

static METRICS_MANAGER: OnceLock<Arc<MetricsManager>> = OnceLock::new();

/// Initialize the global metrics manager. Fails if called twice.
pub fn init_metrics(config: MetricsConfig) -> Result<()> {
    if METRICS_MANAGER.get().is_some() {
        return Err(anyhow!("Metrics manager was already initialized"));
    }

    let manager = Arc::new(MetricsManager::new(config)?);
    METRICS_MANAGER
        .set(manager)
        .map_err(|_| anyhow!("Metrics manager was already initialized"))
}

pub fn get_metrics_manager() -> Result<Arc<MetricsManager>> {
    METRICS_MANAGER
        .get()
        .cloned()
        .ok_or_else(|| anyhow!("Metrics manager not initialized. Call init_metrics() first."))
}

/// Client IP from proxy headers: first `X-Forwarded-For` hop, then `X-Real-IP`
pub fn extract_client_ip(headers: &axum::http::HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim())
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(|ip| ip.trim())
        .filter(|ip| !ip.is_empty())
        .map(|ip| ip.to_string())
}

/// Install the recorder once for the whole test binary
#[cfg(test)]
pub(crate) fn init_test_metrics() -> Arc<MetricsManager> {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        init_metrics(MetricsConfig {
            environment: "test".to_string(),
            ip_allowlist: Some(vec!["127.0.0.1".to_string()]),
        })
        .expect("metrics recorder installs once");
    });
    get_metrics_manager().expect("metrics manager installed")
}
