use anyhow::{Context, Result};
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use garde::Validate;
use std::path::{Path, PathBuf};

use super::AppConfig;

#[derive(Parser, Clone, Debug, Default)]
#[command(name = "graphql-query-guard", version, about = "GraphQL query safety sidecar")]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, env = "APP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server port
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Environment name
    #[arg(long, env = "ENVIRONMENT")]
    pub environment: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Inspect the query in this file, print the decision and exit
    #[arg(long, value_name = "QUERY_FILE")]
    pub check: Option<PathBuf>,
}

impl Cli {
    fn environment_name(&self) -> String {
        self.environment
            .clone()
            .or_else(|| std::env::var("ENVIRONMENT").ok())
            .unwrap_or_else(|| "production".to_string())
    }
}

/// Load configuration from the `config/` directory
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    load_config_from(Path::new("config"), cli)
}

/// Layered configuration, lowest priority first:
///
/// 1. Embedded defaults
/// 2. `<dir>/default.toml`
/// 3. `<dir>/<environment>.toml`
/// 4. The `--config` file
/// 5. `APP_` environment variables, `__` separating nested keys
/// 6. CLI flags
pub fn load_config_from(config_dir: &Path, cli: &Cli) -> Result<AppConfig> {
    let env_name = cli.environment_name();

    let mut figment = Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(config_dir.join("default.toml")))
        .merge(Toml::file(config_dir.join(format!("{env_name}.toml"))));

    if let Some(path) = &cli.config {
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
        figment = figment.merge(Toml::file(path));
    }

    figment = figment
        .merge(Env::prefixed("APP_").split("__"))
        .merge(Serialized::default("environment", env_name.to_lowercase()));

    if let Some(port) = cli.port {
        figment = figment.merge(Serialized::default("server.port", port));
    }
    if cli.debug {
        figment = figment.merge(Serialized::default("logging.level", "debug"));
    }

    let config: AppConfig = figment
        .extract()
        .context("Failed to load configuration")?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    Ok(config)
}
