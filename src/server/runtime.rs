use anyhow::Result;
use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use super::{AppState, handlers};
use crate::config::{AppConfig, HealthConfig};
use crate::health::{liveness_handler, readiness_handler};
use crate::logging::trace_requests;
use crate::middleware::metrics_middleware;
use crate::observability::metrics_endpoint;

/// Run the sidecar until SIGINT or SIGTERM.
///
/// Starts the counter purge task, binds the configured address and marks
/// the guard ready once the listener is up.
pub async fn start_server(config: AppConfig) -> Result<()> {
    info!(
        bind = %config.server.bind,
        port = config.server.port,
        production = config.is_production(),
        "Starting GraphQL query guard"
    );

    let state = AppState::new(&config);
    let cleanup = state.store.spawn_cleanup();
    let health = state.health.clone();

    let app = create_router(state, &config.health);

    let bind_addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {}: {}. Is another process using this port?",
            bind_addr,
            e
        )
    })?;
    info!("Server bound to {}", bind_addr);

    health.mark_ready().await;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(Duration::from_secs(
        config.server.shutdown_timeout,
    )))
    .await?;

    cleanup.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Routing table with request-id tracing, metrics and CORS on every route
pub fn create_router(state: AppState, health: &HealthConfig) -> Router {
    Router::new()
        .route("/inspect", post(handlers::inspect_handler))
        .route("/finalize", post(handlers::finalize_handler))
        .route("/config", get(handlers::config_handler))
        .route("/config/invalidate", post(handlers::invalidate_handler))
        .route("/settings", put(handlers::update_settings_handler))
        .route("/events", get(handlers::events_handler))
        .route("/stats", get(handlers::stats_handler))
        .route("/metrics", get(metrics_endpoint))
        .route(&health.liveness_path, get(liveness_handler))
        .route(&health.readiness_path, get(readiness_handler))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(trace_requests))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Resolves on SIGINT or SIGTERM. In-flight requests then get
/// `drain_timeout` before the process is told to exit.
async fn shutdown_signal(drain_timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }

    tokio::spawn(async move {
        tokio::time::sleep(drain_timeout).await;
        warn!(
            timeout_seconds = drain_timeout.as_secs(),
            "Graceful shutdown timed out, exiting"
        );
        std::process::exit(1);
    });
}
