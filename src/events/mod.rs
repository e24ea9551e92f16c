//! Security event logging
//!
//! Events are fire-and-forget. A failing sink is logged and otherwise
//! ignored; recording an event never fails the request that produced it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    QueryRejected,
    RateLimited,
    SuspiciousQuery,
    QueryTimeout,
    ConfigChanged,
}

impl SecurityEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventType::QueryRejected => "query_rejected",
            SecurityEventType::RateLimited => "rate_limited",
            SecurityEventType::SuspiciousQuery => "suspicious_query",
            SecurityEventType::QueryTimeout => "query_timeout",
            SecurityEventType::ConfigChanged => "config_changed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvent {
    pub id: Uuid,
    pub event_type: SecurityEventType,
    pub message: String,
    pub context: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl SecurityEvent {
    pub fn new(event_type: SecurityEventType, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            message: message.into(),
            context: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

#[derive(Error, Debug)]
pub enum EventSinkError {
    #[error("Event sink is unavailable: {0}")]
    Unavailable(String),

    #[error("Event could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub trait EventSink: Send + Sync {
    fn record(&self, event: &SecurityEvent) -> Result<(), EventSinkError>;
}

/// Record without letting a sink failure escape
pub fn record_best_effort(sink: &dyn EventSink, event: SecurityEvent) {
    if let Err(e) = sink.record(&event) {
        warn!(
            error = %e,
            event_type = event.event_type.as_str(),
            "Failed to record security event"
        );
    }
}

/// Writes events to the `security` tracing target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: &SecurityEvent) -> Result<(), EventSinkError> {
        let context = serde_json::to_string(&event.context)?;
        info!(
            target: "security",
            event_id = %event.id,
            event_type = event.event_type.as_str(),
            context = %context,
            timestamp = %event.timestamp.to_rfc3339(),
            "{}",
            event.message
        );
        Ok(())
    }
}

/// Bounded buffer of the most recent events, newest last
pub struct MemoryEventSink {
    capacity: usize,
    events: Mutex<VecDeque<SecurityEvent>>,
}

impl MemoryEventSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Up to `limit` events, newest first
    pub fn recent(&self, limit: usize) -> Vec<SecurityEvent> {
        match self.events.lock() {
            Ok(events) => events.iter().rev().take(limit).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryEventSink {
    fn default() -> Self {
        Self::new(500)
    }
}

impl EventSink for MemoryEventSink {
    fn record(&self, event: &SecurityEvent) -> Result<(), EventSinkError> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| EventSinkError::Unavailable("event buffer lock poisoned".to_string()))?;
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
        Ok(())
    }
}

/// Sends every event to each inner sink; one failing sink does not stop the rest
#[derive(Default)]
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutEventSink {
    fn record(&self, event: &SecurityEvent) -> Result<(), EventSinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.record(event) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
