//! In-memory TTL counter store
//!
//! Counters live in a single `RwLock` guarding the key map and an expiry
//! index ordered by deadline. Every mutating operation, including the
//! increment-with-ceiling, runs under the write lock, which is what makes
//! concurrent increments for one key linearizable.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::{CounterStats, CounterStore, CounterWindow, Increment, StoreResult};

/// Configuration for the in-memory store
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Maximum number of counters before the soonest-expiring ones are evicted
    pub max_entries: usize,
    /// Interval for the background purge task
    pub cleanup_interval: Duration,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_entries: 100_000,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Clone, Debug)]
struct CounterEntry {
    value: u64,
    started_at: chrono::DateTime<Utc>,
    expires_at: Instant,
}

impl CounterEntry {
    fn new(value: u64, ttl: Duration) -> Self {
        Self {
            value,
            started_at: Utc::now(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    fn window(&self, now: Instant) -> CounterWindow {
        CounterWindow {
            count: self.value,
            started_at: self.started_at,
            resets_in: self.expires_at.saturating_duration_since(now),
        }
    }
}

/// Key map plus an index of `(expires_at, key)` kept in step with it.
///
/// The index makes dropping the soonest-expiring counter O(log n), so neither
/// expiry purges nor capacity eviction ever scan the whole map.
#[derive(Debug, Default)]
struct Counters {
    entries: HashMap<String, CounterEntry>,
    by_expiry: BTreeSet<(Instant, String)>,
}

impl Counters {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, key: &str) -> Option<&CounterEntry> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: &str, entry: CounterEntry) {
        self.by_expiry.insert((entry.expires_at, key.to_string()));
        if let Some(old) = self.entries.insert(key.to_string(), entry.clone()) {
            if old.expires_at != entry.expires_at {
                self.by_expiry.remove(&(old.expires_at, key.to_string()));
            }
        }
    }

    fn remove(&mut self, key: &str) -> Option<CounterEntry> {
        let entry = self.entries.remove(key)?;
        self.by_expiry.remove(&(entry.expires_at, key.to_string()));
        Some(entry)
    }

    fn pop_soonest(&mut self) -> Option<CounterEntry> {
        let (_, key) = self.by_expiry.pop_first()?;
        self.entries.remove(&key)
    }

    /// Drop every counter whose deadline has passed. Cost is proportional to
    /// the number dropped.
    fn purge_expired(&mut self, now: Instant) -> usize {
        let mut purged = 0;
        while let Some((expires_at, _)) = self.by_expiry.first() {
            if *expires_at > now {
                break;
            }
            self.pop_soonest();
            purged += 1;
        }
        purged
    }

    /// Bring the map back within `max_entries`: expired counters go first,
    /// then live counters closest to expiry. Returns `(expired, evicted)`.
    fn enforce_capacity(&mut self, now: Instant, max_entries: usize) -> (usize, usize) {
        if self.len() <= max_entries {
            return (0, 0);
        }

        let expired = self.purge_expired(now);
        let mut evicted = 0;
        while self.len() > max_entries && self.pop_soonest().is_some() {
            evicted += 1;
        }
        (expired, evicted)
    }
}

/// Process-local counter store
#[derive(Clone)]
pub struct MemoryCounterStore {
    config: MemoryStoreConfig,
    counters: Arc<RwLock<Counters>>,
    stats: Arc<RwLock<CounterStats>>,
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new(MemoryStoreConfig::default())
    }
}

impl MemoryCounterStore {
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self {
            config,
            counters: Arc::new(RwLock::new(Counters::default())),
            stats: Arc::new(RwLock::new(CounterStats::default())),
        }
    }

    /// Spawn the periodic purge of expired counters.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_cleanup(&self) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(store.config.cleanup_interval);
            loop {
                interval.tick().await;
                let removed = store.purge_expired().await;
                if removed > 0 {
                    debug!(removed, "Purged expired counters");
                }
            }
        })
    }

    /// Remove expired counters and enforce capacity. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut counters = self.counters.write().await;
        let mut stats = self.stats.write().await;

        let expired = counters.purge_expired(now);
        let (_, evicted) = counters.enforce_capacity(now, self.config.max_entries);
        stats.expired += expired as u64;
        stats.evicted += evicted as u64;
        stats.entries = counters.len() as u64;

        expired + evicted
    }

    pub async fn len(&self) -> usize {
        self.counters.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.counters.read().await.len() == 0
    }

    async fn enforce_capacity(&self, counters: &mut Counters, now: Instant) {
        let (expired, evicted) = counters.enforce_capacity(now, self.config.max_entries);
        if expired + evicted == 0 {
            return;
        }

        let mut stats = self.stats.write().await;
        stats.expired += expired as u64;
        stats.evicted += evicted as u64;
        if evicted > 0 {
            debug!(evicted, max_entries = self.config.max_entries, "Evicted live counters at capacity");
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> StoreResult<Option<u64>> {
        let now = Instant::now();
        let mut counters = self.counters.write().await;
        let mut stats = self.stats.write().await;

        match counters.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                stats.hits += 1;
                Ok(Some(entry.value))
            }
            Some(_) => {
                counters.remove(key);
                stats.expired += 1;
                stats.misses += 1;
                Ok(None)
            }
            None => {
                stats.misses += 1;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: u64, ttl: Duration) -> StoreResult<()> {
        let now = Instant::now();
        let mut counters = self.counters.write().await;
        counters.insert(key, CounterEntry::new(value, ttl));
        self.enforce_capacity(&mut counters, now).await;
        Ok(())
    }

    async fn increment_below(
        &self,
        key: &str,
        ceiling: u64,
        ttl: Duration,
    ) -> StoreResult<Increment> {
        let now = Instant::now();
        let mut counters = self.counters.write().await;

        let live = counters
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .cloned();

        let outcome = match live {
            Some(entry) if entry.value >= ceiling => Increment::Saturated(entry.window(now)),
            Some(mut entry) => {
                entry.value += 1;
                let window = entry.window(now);
                counters.insert(key, entry);
                Increment::Applied(window)
            }
            None if ceiling == 0 => Increment::Saturated(CounterWindow {
                count: 0,
                started_at: Utc::now(),
                resets_in: ttl,
            }),
            None => {
                let entry = CounterEntry::new(1, ttl);
                let window = entry.window(now);
                counters.insert(key, entry);
                self.enforce_capacity(&mut counters, now).await;
                Increment::Applied(window)
            }
        };

        if !outcome.is_applied() {
            self.stats.write().await.saturated += 1;
        }

        Ok(outcome)
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.counters.write().await.remove(key);
        Ok(())
    }

    async fn stats(&self) -> CounterStats {
        let mut result = self.stats.read().await.clone();
        result.entries = self.counters.read().await.len() as u64;
        result
    }
}
