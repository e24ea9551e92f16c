//! Counter store for rate-limit windows and short-lived cached counts
//!
//! The guard never owns persistent state itself. Everything that must
//! survive between requests (rate windows, the recent block count) lives in
//! a [`CounterStore`], which the host may back with whatever shared storage
//! it has. The in-memory [`MemoryCounterStore`] is the default.
//!
//! # Atomicity
//!
//! A plain get-then-set rate limiter lets two concurrent requests from the
//! same client both observe "under limit" and both pass. Implementations
//! must therefore provide [`CounterStore::increment_below`] as a single
//! atomic step: create-or-increment, compared against the ceiling, under one
//! lock or one storage-side primitive.

pub mod memory;

pub use memory::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Counter store unavailable: {0}")]
    Unavailable(String),

    #[error("Counter store operation failed: {0}")]
    OperationFailed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Snapshot of a single TTL counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterWindow {
    /// Current value of the counter
    pub count: u64,
    /// Wall-clock time the counter was created
    pub started_at: DateTime<Utc>,
    /// Time left until the counter expires
    pub resets_in: Duration,
}

/// Outcome of [`CounterStore::increment_below`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Increment {
    /// The counter was below the ceiling and has been incremented
    Applied(CounterWindow),
    /// The counter already reached the ceiling and was left untouched
    Saturated(CounterWindow),
}

impl Increment {
    pub fn is_applied(&self) -> bool {
        matches!(self, Increment::Applied(_))
    }

    pub fn window(&self) -> &CounterWindow {
        match self {
            Increment::Applied(window) | Increment::Saturated(window) => window,
        }
    }
}

/// Store statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct CounterStats {
    /// Reads that found a live counter
    pub hits: u64,
    /// Reads that found nothing (or an expired counter)
    pub misses: u64,
    /// Counters currently held
    pub entries: u64,
    /// Counters dropped because their TTL elapsed
    pub expired: u64,
    /// Increments refused because the ceiling was reached
    pub saturated: u64,
    /// Live counters dropped to stay within capacity
    pub evicted: u64,
}

/// Key-value counter store with per-key TTL
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Read a live counter, `None` when absent or expired
    async fn get(&self, key: &str) -> StoreResult<Option<u64>>;

    /// Overwrite a counter and restart its TTL
    async fn set(&self, key: &str, value: u64, ttl: Duration) -> StoreResult<()>;

    /// Atomically create-or-increment `key` unless it already holds
    /// `ceiling` or more.
    ///
    /// A new counter starts at 1 with the given `ttl`. The TTL of an existing
    /// counter is never extended, so windows are fixed rather than sliding.
    async fn increment_below(&self, key: &str, ceiling: u64, ttl: Duration)
        -> StoreResult<Increment>;

    /// Drop a counter
    async fn remove(&self, key: &str) -> StoreResult<()>;

    async fn stats(&self) -> CounterStats {
        CounterStats::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_accessors() {
        let window = CounterWindow {
            count: 3,
            started_at: Utc::now(),
            resets_in: Duration::from_secs(10),
        };

        let applied = Increment::Applied(window.clone());
        assert!(applied.is_applied());
        assert_eq!(applied.window().count, 3);

        let saturated = Increment::Saturated(window);
        assert!(!saturated.is_applied());
        assert_eq!(saturated.window().resets_in, Duration::from_secs(10));
    }

    #[test]
    fn test_store_error_messages() {
        let err = StoreError::Unavailable("redis down".to_string());
        assert_eq!(err.to_string(), "Counter store unavailable: redis down");
    }
}
