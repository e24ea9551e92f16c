pub mod config;
pub mod error;
pub mod events;
pub mod guard;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod store;

#[cfg(feature = "benchmarks")]
pub mod benchmarks;

pub use config::*;
pub use error::*;
pub use guard::{ClientIdentity, GuardDecision, QueryGuard, RequestInterceptor};
pub use server::*;

use anyhow::{Context, Result};
use std::panic;
use std::path::Path;

/// Main server entry point for library usage
pub async fn run_server(cli: &Cli) -> Result<()> {
    let app_config = config::load_config(cli)?;

    observability::init_observability(&app_config)?;

    // Set up after the subscriber so the panic is logged
    panic::set_hook(Box::new(|panic_info| {
        ::tracing::error!(?panic_info, "FATAL: Panic occurred");
        std::process::exit(1);
    }));

    server::start_server(app_config).await
}

/// Inspect the query stored in `query_file` under the loaded configuration,
/// as a local client, without starting the server
pub async fn check_query_file(cli: &Cli, query_file: &Path) -> Result<GuardDecision> {
    let app_config = config::load_config(cli)?;
    let query = std::fs::read_to_string(query_file)
        .with_context(|| format!("Failed to read query file {}", query_file.display()))?;

    let state = AppState::new(&app_config);
    let client = ClientIdentity::new("127.0.0.1", None);

    Ok(state
        .guard
        .inspect(&query, &client, app_config.is_production())
        .await)
}
