use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize, Serialize, Validate, Default)]
pub struct AppConfig {
    #[garde(dive)]
    #[serde(default)]
    pub server: ServerConfig,

    #[garde(dive)]
    #[serde(default)]
    pub logging: LoggingConfig,

    #[garde(dive)]
    #[serde(default)]
    pub health: HealthConfig,

    #[garde(dive)]
    #[serde(default)]
    pub metrics: MetricsSettings,

    #[garde(dive)]
    #[serde(default)]
    pub guard: GuardSettings,

    #[garde(skip)]
    #[serde(default)]
    pub environment: Environment,

    /// Plugin option values seeding the guard's settings source
    #[garde(skip)]
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
}

impl AppConfig {
    /// Whether introspection blocking and other production-only checks apply
    pub fn is_production(&self) -> bool {
        self.guard
            .production
            .unwrap_or(self.environment == Environment::Production)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ServerConfig {
    #[garde(range(min = 1024, max = 65535))]
    pub port: u16,

    #[garde(length(min = 1), custom(validate_bind_address))]
    #[serde(default = "default_bind")]
    pub bind: String,

    #[garde(range(min = 1, max = 300))]
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64, // seconds
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            bind: default_bind(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LoggingConfig {
    #[garde(length(min = 1))]
    #[serde(default = "default_log_level")]
    pub level: String, // trace, debug, info, warn, error

    #[garde(pattern(r"^(json|pretty)$"))]
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct HealthConfig {
    #[garde(length(min = 1), pattern(r"^/"))]
    #[serde(default = "default_liveness_path")]
    pub liveness_path: String,

    #[garde(length(min = 1), pattern(r"^/"))]
    #[serde(default = "default_readiness_path")]
    pub readiness_path: String,
}

fn default_liveness_path() -> String {
    "/health".to_string()
}

fn default_readiness_path() -> String {
    "/health/ready".to_string()
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            liveness_path: default_liveness_path(),
            readiness_path: default_readiness_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct MetricsSettings {
    #[garde(skip)]
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Addresses allowed to scrape `/metrics`; everyone when unset
    #[garde(skip)]
    #[serde(default)]
    pub ip_allowlist: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ip_allowlist: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct GuardSettings {
    /// Overrides the environment-derived production flag
    #[garde(skip)]
    #[serde(default)]
    pub production: Option<bool>,

    /// Recent security events kept for `/events`
    #[garde(range(min = 1, max = 10000))]
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    #[garde(range(min = 100))]
    #[serde(default = "default_max_counters")]
    pub max_counters: usize,

    #[garde(range(min = 1, max = 3600))]
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

fn default_event_buffer() -> usize {
    500
}

fn default_max_counters() -> usize {
    100_000
}

fn default_cleanup_interval() -> u64 {
    60
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            production: None,
            event_buffer: default_event_buffer(),
            max_counters: default_max_counters(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

fn validate_bind_address(value: &str, _: &()) -> garde::Result {
    value
        .parse::<std::net::IpAddr>()
        .map(|_| ())
        .map_err(|_| garde::Error::new("Invalid IP address"))
}
