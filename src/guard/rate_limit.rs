//! Per-client fixed-window rate limiting
//!
//! Each client gets one counter per window, keyed by a hash of its IP and
//! a purpose tag. Headless front-ends and static-site build tools legitimately
//! burst, so they are measured against the burst budget instead of the
//! per-minute budget.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::config::EffectiveConfig;
use crate::observability::record_rate_limit_check;
use crate::store::{CounterStore, Increment};

pub const DEFAULT_PURPOSE: &str = "graphql";

/// Who sent a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl ClientIdentity {
    pub fn new(ip: impl Into<String>, user_agent: Option<String>) -> Self {
        Self {
            ip: ip.into(),
            user_agent,
        }
    }

    /// Identity used when the transport gives no address
    pub fn unknown() -> Self {
        Self::new("unknown", None)
    }

    /// Storage key for `purpose`. The raw IP never leaves this function.
    pub fn client_key(&self, purpose: &str) -> String {
        let digest = Sha256::digest(self.ip.as_bytes());
        format!("{}_{}", purpose, hex::encode(digest))
    }

    pub fn is_build_tool(&self) -> bool {
        self.user_agent.as_deref().is_some_and(is_build_tool)
    }
}

static BUILD_TOOL_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Static-site generators and SSR frameworks that fetch many pages at build time
pub fn is_build_tool(user_agent: &str) -> bool {
    BUILD_TOOL_PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)gatsby|next\.?js|nuxt|gridsome|astro|faust|sveltekit|eleventy|hugo|apollo",
            )
            .unwrap()
        })
        .is_match(user_agent)
}

/// Counter state for one client window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateWindow {
    pub client_key: String,
    pub window_start: DateTime<Utc>,
    /// Requests made in the window, counting a refused one
    pub count: u64,
    pub limit: u64,
    pub window_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed(RateWindow),
    Limited(RateWindow),
    /// No counter was touched
    Bypassed { reason: &'static str },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, RateLimitResult::Limited(_))
    }

    pub fn window(&self) -> Option<&RateWindow> {
        match self {
            RateLimitResult::Allowed(window) | RateLimitResult::Limited(window) => Some(window),
            RateLimitResult::Bypassed { .. } => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            RateLimitResult::Allowed(_) => "allowed",
            RateLimitResult::Limited(_) => "limited",
            RateLimitResult::Bypassed { .. } => "bypassed",
        }
    }
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    purpose: String,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self::with_purpose(store, DEFAULT_PURPOSE)
    }

    pub fn with_purpose(store: Arc<dyn CounterStore>, purpose: impl Into<String>) -> Self {
        Self {
            store,
            purpose: purpose.into(),
        }
    }

    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    /// Requests allowed per window for this client
    pub fn threshold(&self, client: &ClientIdentity, config: &EffectiveConfig) -> u64 {
        if config.headless_mode || client.is_build_tool() {
            config.rate_limit.burst_limit
        } else {
            config.rate_limit.requests_per_minute
        }
    }

    /// Count this request against the client's window.
    ///
    /// Counter-store failures fail open: the request is allowed and the
    /// failure is logged.
    pub async fn check(&self, client: &ClientIdentity, config: &EffectiveConfig) -> RateLimitResult {
        let result = self.evaluate(client, config).await;
        record_rate_limit_check(result.label());
        result
    }

    /// `check` reduced to allow/deny
    pub async fn allow(&self, client: &ClientIdentity, config: &EffectiveConfig) -> bool {
        self.check(client, config).await.is_allowed()
    }

    async fn evaluate(&self, client: &ClientIdentity, config: &EffectiveConfig) -> RateLimitResult {
        if !config.rate_limit.enabled {
            return RateLimitResult::Bypassed {
                reason: "rate limiting disabled",
            };
        }

        let key = client.client_key(&self.purpose);
        let limit = self.threshold(client, config);
        let window_seconds = config.rate_limit.window_seconds;

        let outcome = match self
            .store
            .increment_below(&key, limit, Duration::from_secs(window_seconds))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    purpose = %self.purpose,
                    "Rate limit check failed, allowing request"
                );
                return RateLimitResult::Bypassed {
                    reason: "counter store unavailable",
                };
            }
        };

        let counter = outcome.window();
        let attempted = if outcome.is_applied() {
            counter.count
        } else {
            counter.count.saturating_add(1)
        };
        let window = RateWindow {
            client_key: key,
            window_start: counter.started_at,
            count: attempted,
            limit,
            window_seconds,
        };

        match outcome {
            Increment::Applied(_) => RateLimitResult::Allowed(window),
            Increment::Saturated(_) => {
                tracing::debug!(
                    client_key = %window.client_key,
                    count = window.count,
                    limit,
                    "Client exceeded rate limit"
                );
                RateLimitResult::Limited(window)
            }
        }
    }
}
