use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::store::CounterStore;

pub const GUARD_COMPONENT: &str = "guard";
pub const STORE_COMPONENT: &str = "counter_store";

const STORE_PROBE_KEY: &str = "graphql_guard_health_probe";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Serving, but a dependency is impaired (rate limiting fails open)
    Degraded,
    Unhealthy,
    Starting,
}

impl HealthStatus {
    // Lower is worse
    fn priority(self) -> u8 {
        match self {
            HealthStatus::Unhealthy => 0,
            HealthStatus::Starting => 1,
            HealthStatus::Degraded => 2,
            HealthStatus::Healthy => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub message: String,
    pub last_checked: DateTime<Utc>,
}

impl ComponentHealth {
    fn new(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            last_checked: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Worst status across all components
    pub status: HealthStatus,
    pub components: BTreeMap<String, ComponentHealth>,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone)]
struct CachedHealth {
    response: HealthResponse,
    cached_at: Instant,
}

/// Readiness state for the sidecar.
///
/// The counter store is probed at most once per cache TTL; component updates
/// clear the cache.
#[derive(Clone)]
pub struct HealthManager {
    components: Arc<RwLock<BTreeMap<String, ComponentHealth>>>,
    cache: Arc<RwLock<Option<CachedHealth>>>,
    store: Option<Arc<dyn CounterStore>>,
    startup_time: Instant,
    cache_ttl: Duration,
    startup_grace_period: Duration,
}

impl HealthManager {
    pub fn new() -> Self {
        let mut components = BTreeMap::new();
        components.insert(
            GUARD_COMPONENT.to_string(),
            ComponentHealth::new(HealthStatus::Starting, "Query guard starting up"),
        );

        Self {
            components: Arc::new(RwLock::new(components)),
            cache: Arc::new(RwLock::new(None)),
            store: None,
            startup_time: Instant::now(),
            cache_ttl: Duration::from_secs(5),
            startup_grace_period: Duration::from_secs(30),
        }
    }

    /// Probe `store` on every uncached readiness check
    pub fn with_store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Called once the listener is bound
    pub async fn mark_ready(&self) {
        self.update_component(GUARD_COMPONENT, HealthStatus::Healthy, "Query guard is ready")
            .await;
    }

    pub async fn update_component(&self, name: &str, status: HealthStatus, message: impl Into<String>) {
        self.components
            .write()
            .await
            .insert(name.to_string(), ComponentHealth::new(status, message));

        *self.cache.write().await = None;
        info!(component = name, status = ?status, "Component health updated");
    }

    pub async fn get_health(&self) -> HealthResponse {
        if let Some(cached) = &*self.cache.read().await {
            if cached.cached_at.elapsed() <= self.cache_ttl {
                return cached.response.clone();
            }
        }

        self.refresh_health().await
    }

    pub fn is_in_startup_period(&self) -> bool {
        self.startup_time.elapsed() < self.startup_grace_period
    }

    async fn refresh_health(&self) -> HealthResponse {
        if let Some(store) = &self.store {
            let component = match store.get(STORE_PROBE_KEY).await {
                Ok(_) => ComponentHealth::new(HealthStatus::Healthy, "Counter store reachable"),
                Err(e) => {
                    warn!(error = %e, "Counter store health probe failed");
                    ComponentHealth::new(
                        HealthStatus::Degraded,
                        "Counter store unavailable, rate limiting fails open",
                    )
                }
            };
            self.components
                .write()
                .await
                .insert(STORE_COMPONENT.to_string(), component);
        }

        let components = self.components.read().await.clone();
        let status = components
            .values()
            .map(|c| c.status)
            .min_by_key(|s| s.priority())
            .unwrap_or(HealthStatus::Healthy);

        let response = HealthResponse {
            status,
            components,
            timestamp: Utc::now(),
            uptime_seconds: self.startup_time.elapsed().as_secs(),
        };

        *self.cache.write().await = Some(CachedHealth {
            response: response.clone(),
            cached_at: Instant::now(),
        });

        response
    }
}

impl Default for HealthManager {
    fn default() -> Self {
        Self::new()
    }
}
