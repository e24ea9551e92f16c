//! Persisted plugin settings as seen by the guard
//!
//! The host owns settings persistence. The guard only needs a read-only view
//! of loosely typed option values plus a revision number that changes
//! whenever any value changes, so cached configuration can be dropped.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Option keys read by [`ConfigResolver`](super::ConfigResolver)
pub mod keys {
    pub const QUERY_DEPTH_LIMIT: &str = "query_depth_limit";
    pub const QUERY_COMPLEXITY_LIMIT: &str = "query_complexity_limit";
    pub const QUERY_TIMEOUT: &str = "query_timeout";
    pub const INTROSPECTION_ENABLED: &str = "introspection_enabled";
    pub const DEBUG_MODE: &str = "debug_mode";
    pub const ENDPOINT_ACCESS: &str = "endpoint_access";
    pub const BATCH_ENABLED: &str = "batch_enabled";
    pub const BATCH_LIMIT: &str = "batch_limit";
    pub const HEADLESS_MODE: &str = "headless_mode";
    pub const STRICT_VALIDATION: &str = "strict_validation";
    pub const RATE_LIMIT_ENABLED: &str = "rate_limit_enabled";
    /// Host runtime execution limit in seconds, 0 meaning unlimited
    pub const MAX_EXECUTION_TIME: &str = "max_execution_time";
    /// Native settings object of the host GraphQL server
    pub const HOST_GRAPHQL_SETTINGS: &str = "graphql_general_settings";
}

/// Read-only key-value settings
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    /// Monotonic counter bumped on every change. Sources that never change
    /// may keep the default.
    fn revision(&self) -> u64 {
        0
    }
}

/// Settings held in memory, seeded from the `[settings]` config table
#[derive(Debug, Default)]
pub struct MemoryConfigSource {
    values: RwLock<BTreeMap<String, Value>>,
    revision: AtomicU64,
}

impl MemoryConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: BTreeMap<String, Value>) -> Self {
        Self {
            values: RwLock::new(values),
            revision: AtomicU64::new(0),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.into(), value);
        }
        self.revision.fetch_add(1, Ordering::AcqRel);
    }

    /// Merge several values as one revision
    pub fn merge(&self, updates: BTreeMap<String, Value>) {
        if let Ok(mut values) = self.values.write() {
            values.extend(updates);
        }
        self.revision.fetch_add(1, Ordering::AcqRel);
    }

    pub fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.write() {
            values.remove(key);
        }
        self.revision.fetch_add(1, Ordering::AcqRel);
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.values
            .read()
            .map(|values| values.clone())
            .unwrap_or_default()
    }
}

impl ConfigSource for MemoryConfigSource {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }
}

/// Read a positive integer option.
///
/// Settings stores commonly keep numbers as strings, so numeric strings are
/// accepted. Anything else, including zero and negatives, reads as absent.
pub fn read_positive(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;

    u32::try_from(number).ok().filter(|n| *n > 0)
}

/// Read a non-negative integer option, where 0 is meaningful
pub fn read_unsigned(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Read a boolean option in any of the spellings settings forms produce
pub fn read_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
