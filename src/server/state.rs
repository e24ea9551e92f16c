use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, ConfigResolver, MemoryConfigSource};
use crate::events::{EventSink, FanoutEventSink, MemoryEventSink, TracingEventSink};
use crate::guard::QueryGuard;
use crate::health::HealthManager;
use crate::store::{MemoryCounterStore, MemoryStoreConfig};

/// Shared handler state. Every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<QueryGuard>,
    pub source: Arc<MemoryConfigSource>,
    pub store: MemoryCounterStore,
    /// Recent events kept for `/events`
    pub events: Arc<MemoryEventSink>,
    /// Every event goes here: the log plus the recent buffer
    pub sink: Arc<dyn EventSink>,
    pub health: HealthManager,
    pub production: bool,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let source = Arc::new(MemoryConfigSource::from_map(config.settings.clone()));
        let store = MemoryCounterStore::new(MemoryStoreConfig {
            max_entries: config.guard.max_counters,
            cleanup_interval: Duration::from_secs(config.guard.cleanup_interval_seconds),
        });
        let events = Arc::new(MemoryEventSink::new(config.guard.event_buffer));
        let sink: Arc<dyn EventSink> = Arc::new(
            FanoutEventSink::new()
                .with_sink(Arc::new(TracingEventSink))
                .with_sink(events.clone()),
        );

        let guard = Arc::new(QueryGuard::new(
            Arc::new(ConfigResolver::new(source.clone())),
            Arc::new(store.clone()),
            sink.clone(),
        ));
        let health = HealthManager::new().with_store(Arc::new(store.clone()));

        Self {
            guard,
            source,
            store,
            events,
            sink,
            health,
            production: config.is_production(),
        }
    }
}

impl FromRef<AppState> for HealthManager {
    fn from_ref(state: &AppState) -> Self {
        state.health.clone()
    }
}
