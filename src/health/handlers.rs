use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::debug;

use super::{HealthManager, HealthStatus};

/// Liveness probe: the process is up, whether or not it is ready
pub async fn liveness_handler() -> &'static str {
    "OK"
}

/// Readiness probe.
///
/// Degraded still counts as ready because the guard fails open without its
/// counter store. A component stuck in `starting` is only tolerated during
/// the startup grace period.
pub async fn readiness_handler(State(health_manager): State<HealthManager>) -> Response {
    let health = health_manager.get_health().await;
    debug!(status = ?health.status, "Readiness check");

    let ready = match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => true,
        HealthStatus::Starting => health_manager.is_in_startup_period(),
        HealthStatus::Unhealthy => false,
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::GUARD_COMPONENT;
    use std::time::Duration;

    #[tokio::test]
    async fn test_liveness_handler() {
        assert_eq!(liveness_handler().await, "OK");
    }

    #[tokio::test]
    async fn test_readiness_when_ready() {
        let manager = HealthManager::new();
        manager.mark_ready().await;

        let response = readiness_handler(State(manager)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_starting_is_ready_during_grace_period() {
        let response = readiness_handler(State(HealthManager::new())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_starting_after_grace_period_is_unavailable() {
        let manager = HealthManager::new();
        tokio::time::advance(Duration::from_secs(31)).await;

        let response = readiness_handler(State(manager)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unhealthy_component() {
        let manager = HealthManager::new();
        manager
            .update_component(GUARD_COMPONENT, HealthStatus::Unhealthy, "Shutting down")
            .await;

        let response = readiness_handler(State(manager)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
