//! Effective guard configuration
//!
//! Three layers are merged into one snapshot:
//!
//! 1. Hard defaults, overridden by well-formed local plugin settings
//! 2. The host GraphQL server's native settings, when it exposes them
//! 3. The headless profile, which widens limits for decoupled front-ends
//!
//! The snapshot is cached behind an [`ArcSwapOption`] and recomputed when
//! [`ConfigResolver::invalidate`] is called or the source revision moves.

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::source::{ConfigSource, keys, read_flag, read_positive, read_unsigned};

pub const DEFAULT_DEPTH_LIMIT: u32 = 8;
pub const DEFAULT_COMPLEXITY_LIMIT: u32 = 100;
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 30;
pub const DEFAULT_BATCH_LIMIT: u32 = 10;

pub const HEADLESS_DEPTH_LIMIT: u32 = 15;
pub const HEADLESS_COMPLEXITY_LIMIT: u32 = 200;
pub const HEADLESS_TIMEOUT_SECONDS: u32 = 10;

pub const DEPTH_RANGE: (u32, u32) = (1, 20);
pub const COMPLEXITY_RANGE: (u32, u32) = (10, 1000);
pub const TIMEOUT_RANGE: (u32, u32) = (1, 30);

pub const RATE_WINDOW_SECONDS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EndpointAccess {
    #[default]
    Public,
    Restricted,
}

impl EndpointAccess {
    fn parse(value: &Value) -> Option<Self> {
        match value.as_str()?.trim().to_ascii_lowercase().as_str() {
            "public" => Some(EndpointAccess::Public),
            "restricted" | "private" | "authenticated" => Some(EndpointAccess::Restricted),
            _ => None,
        }
    }
}

/// Per-client request budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub enabled: bool,
    pub requests_per_minute: u64,
    /// Budget for headless and build-tool traffic
    pub burst_limit: u64,
    pub window_seconds: u64,
}

impl RateLimitPolicy {
    /// Headless-aware base, raised when batching lets one request carry
    /// several operations.
    pub fn derive(headless_mode: bool, batch_enabled: bool, batch_limit: u32) -> Self {
        let base: u64 = if headless_mode { 120 } else { 60 };
        let requests_per_minute = if batch_enabled {
            base + u64::from(batch_limit.min(10)) * 10
        } else {
            base
        };

        Self {
            enabled: true,
            requests_per_minute,
            burst_limit: requests_per_minute * 3 / 2,
            window_seconds: RATE_WINDOW_SECONDS,
        }
    }
}

/// Resolved limits used for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub query_depth_limit: u32,
    pub query_complexity_limit: u32,
    pub query_timeout_seconds: u32,
    pub introspection_enabled: bool,
    pub debug_mode: bool,
    pub endpoint_access: EndpointAccess,
    pub batch_enabled: bool,
    pub batch_limit: u32,
    pub headless_mode: bool,
    pub alias_limit: u32,
    pub directive_limit: u32,
    pub field_duplicate_limit: u32,
    /// Also reject on the estimated complexity score
    pub strict_validation: bool,
    pub rate_limit: RateLimitPolicy,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl EffectiveConfig {
    /// Defaults with headless mode off
    pub fn standard() -> Self {
        Self::profile(false)
    }

    /// Defaults with the headless profile applied
    pub fn headless() -> Self {
        Self::profile(true)
    }

    fn profile(headless_mode: bool) -> Self {
        let (depth, complexity, timeout) = if headless_mode {
            (HEADLESS_DEPTH_LIMIT, HEADLESS_COMPLEXITY_LIMIT, HEADLESS_TIMEOUT_SECONDS)
        } else {
            (DEFAULT_DEPTH_LIMIT, DEFAULT_COMPLEXITY_LIMIT, DEFAULT_TIMEOUT_SECONDS)
        };

        Self {
            query_depth_limit: depth,
            query_complexity_limit: complexity,
            query_timeout_seconds: timeout,
            introspection_enabled: false,
            debug_mode: false,
            endpoint_access: EndpointAccess::Public,
            batch_enabled: true,
            batch_limit: DEFAULT_BATCH_LIMIT,
            headless_mode,
            alias_limit: alias_limit(headless_mode),
            directive_limit: directive_limit(headless_mode),
            field_duplicate_limit: field_duplicate_limit(headless_mode),
            strict_validation: false,
            rate_limit: RateLimitPolicy::derive(headless_mode, true, DEFAULT_BATCH_LIMIT),
        }
    }

    /// Reporting-only posture score
    pub fn security_score(&self) -> SecurityScore {
        let mut points = 0;
        if !self.introspection_enabled {
            points += 2;
        }
        if !self.debug_mode {
            points += 2;
        }
        if self.endpoint_access == EndpointAccess::Restricted {
            points += 3;
        }
        if self.query_depth_limit > 0 && self.query_depth_limit <= 15 {
            points += 2;
        }
        if self.batch_limit <= 20 {
            points += 1;
        }

        let rating = if points >= 8 {
            SecurityRating::High
        } else if points >= 5 {
            SecurityRating::Medium
        } else {
            SecurityRating::Low
        };

        SecurityScore { points, rating }
    }

    fn clamp(mut self) -> Self {
        self.query_depth_limit = self.query_depth_limit.clamp(DEPTH_RANGE.0, DEPTH_RANGE.1);
        self.query_complexity_limit = self
            .query_complexity_limit
            .clamp(COMPLEXITY_RANGE.0, COMPLEXITY_RANGE.1);
        self.query_timeout_seconds = self
            .query_timeout_seconds
            .clamp(TIMEOUT_RANGE.0, TIMEOUT_RANGE.1);
        self.batch_limit = self.batch_limit.max(1);
        self
    }
}

pub fn alias_limit(headless_mode: bool) -> u32 {
    if headless_mode { 50 } else { 20 }
}

pub fn directive_limit(headless_mode: bool) -> u32 {
    if headless_mode { 30 } else { 15 }
}

pub fn field_duplicate_limit(headless_mode: bool) -> u32 {
    if headless_mode { 20 } else { 10 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityRating {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityScore {
    pub points: u8,
    pub rating: SecurityRating,
}

/// Settings exposed by the host GraphQL server itself.
///
/// Every field is optional: hosts expose different subsets, and a missing
/// or unreadable field leaves the local value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeSettings {
    pub query_depth_enabled: Option<bool>,
    pub query_depth_max: Option<u32>,
    pub public_introspection_enabled: Option<bool>,
    pub batch_queries_enabled: Option<bool>,
    pub batch_limit: Option<u32>,
    pub restrict_endpoint_to_logged_in_users: Option<bool>,
    pub debug_mode_enabled: Option<bool>,
}

impl NativeSettings {
    /// Parse the host's settings object; anything but an object means the
    /// host exposes no native settings.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let flag = |key: &str| object.get(key).and_then(read_flag);

        Some(Self {
            query_depth_enabled: flag("query_depth_enabled"),
            query_depth_max: object.get("query_depth_max").and_then(read_positive),
            public_introspection_enabled: flag("public_introspection_enabled"),
            batch_queries_enabled: flag("batch_queries_enabled"),
            batch_limit: object.get("batch_limit").and_then(read_positive),
            restrict_endpoint_to_logged_in_users: flag("restrict_endpoint_to_logged_in_users"),
            debug_mode_enabled: flag("debug_mode_enabled"),
        })
    }

    /// Depth ceiling enforced by the host, if depth limiting is switched on
    pub fn depth_ceiling(&self) -> Option<u32> {
        match self.query_depth_enabled {
            Some(true) => self.query_depth_max,
            _ => None,
        }
    }
}

struct CachedConfig {
    revision: u64,
    config: Arc<EffectiveConfig>,
}

/// Merges settings layers into an [`EffectiveConfig`] and caches the result
pub struct ConfigResolver {
    source: Arc<dyn ConfigSource>,
    cache: ArcSwapOption<CachedConfig>,
}

impl ConfigResolver {
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self {
            source,
            cache: ArcSwapOption::empty(),
        }
    }

    pub fn source(&self) -> &Arc<dyn ConfigSource> {
        &self.source
    }

    /// Current snapshot, recomputed when the cache is empty or stale
    pub fn resolve(&self) -> Arc<EffectiveConfig> {
        let revision = self.source.revision();

        if let Some(cached) = self.cache.load_full() {
            if cached.revision == revision {
                return cached.config.clone();
            }
        }

        let config = Arc::new(self.compute());
        self.cache.store(Some(Arc::new(CachedConfig {
            revision,
            config: config.clone(),
        })));

        debug!(
            revision,
            depth = config.query_depth_limit,
            complexity = config.query_complexity_limit,
            timeout = config.query_timeout_seconds,
            headless = config.headless_mode,
            "Resolved effective GraphQL guard configuration"
        );

        config
    }

    /// Drop the cached snapshot. Call whenever headless mode is toggled.
    pub fn invalidate(&self) {
        self.cache.store(None);
        debug!("GraphQL guard configuration cache invalidated");
    }

    pub fn security_score(&self) -> SecurityScore {
        self.resolve().security_score()
    }

    fn compute(&self) -> EffectiveConfig {
        let source = self.source.as_ref();
        let read = |key: &str| source.get(key);

        let headless_mode = read(keys::HEADLESS_MODE)
            .as_ref()
            .and_then(read_flag)
            .unwrap_or(false);

        let execution_limit = read(keys::MAX_EXECUTION_TIME)
            .as_ref()
            .and_then(read_unsigned)
            .unwrap_or(0);
        let base_timeout = if execution_limit == 0 {
            DEFAULT_TIMEOUT_SECONDS
        } else {
            execution_limit.min(DEFAULT_TIMEOUT_SECONDS)
        };

        let local_timeout = read(keys::QUERY_TIMEOUT).as_ref().and_then(read_positive);

        let mut config = EffectiveConfig::standard();
        config.headless_mode = headless_mode;
        config.query_depth_limit = read(keys::QUERY_DEPTH_LIMIT)
            .as_ref()
            .and_then(read_positive)
            .unwrap_or(DEFAULT_DEPTH_LIMIT);
        config.query_complexity_limit = read(keys::QUERY_COMPLEXITY_LIMIT)
            .as_ref()
            .and_then(read_positive)
            .unwrap_or(DEFAULT_COMPLEXITY_LIMIT);
        config.query_timeout_seconds = local_timeout.unwrap_or(base_timeout);
        config.introspection_enabled = read(keys::INTROSPECTION_ENABLED)
            .as_ref()
            .and_then(read_flag)
            .unwrap_or(false);
        config.debug_mode = read(keys::DEBUG_MODE)
            .as_ref()
            .and_then(read_flag)
            .unwrap_or(false);
        config.endpoint_access = read(keys::ENDPOINT_ACCESS)
            .as_ref()
            .and_then(EndpointAccess::parse)
            .unwrap_or_default();
        config.batch_enabled = read(keys::BATCH_ENABLED)
            .as_ref()
            .and_then(read_flag)
            .unwrap_or(true);
        config.batch_limit = read(keys::BATCH_LIMIT)
            .as_ref()
            .and_then(read_positive)
            .unwrap_or(DEFAULT_BATCH_LIMIT);
        config.strict_validation = read(keys::STRICT_VALIDATION)
            .as_ref()
            .and_then(read_flag)
            .unwrap_or(false);

        if headless_mode {
            config.query_depth_limit = config.query_depth_limit.max(HEADLESS_DEPTH_LIMIT);
            config.query_complexity_limit =
                config.query_complexity_limit.max(HEADLESS_COMPLEXITY_LIMIT);
            if local_timeout.is_none() {
                config.query_timeout_seconds = HEADLESS_TIMEOUT_SECONDS;
            }
        }

        let native = read(keys::HOST_GRAPHQL_SETTINGS)
            .as_ref()
            .and_then(NativeSettings::from_value);

        if let Some(native) = native {
            if let Some(ceiling) = native.depth_ceiling() {
                config.query_depth_limit = config.query_depth_limit.min(ceiling);
            }
            if let Some(enabled) = native.public_introspection_enabled {
                config.introspection_enabled = enabled;
            }
            if let Some(enabled) = native.batch_queries_enabled {
                config.batch_enabled = enabled;
            }
            if let Some(limit) = native.batch_limit {
                config.batch_limit = limit;
            }
            if let Some(restricted) = native.restrict_endpoint_to_logged_in_users {
                config.endpoint_access = if restricted {
                    EndpointAccess::Restricted
                } else {
                    EndpointAccess::Public
                };
            }
            if let Some(debug) = native.debug_mode_enabled {
                config.debug_mode = debug;
            }
        }

        config.alias_limit = alias_limit(headless_mode);
        config.directive_limit = directive_limit(headless_mode);
        config.field_duplicate_limit = field_duplicate_limit(headless_mode);

        let mut config = config.clamp();

        let rate_enabled = read(keys::RATE_LIMIT_ENABLED)
            .as_ref()
            .and_then(read_flag)
            .unwrap_or(true);
        config.rate_limit =
            RateLimitPolicy::derive(headless_mode, config.batch_enabled, config.batch_limit);
        config.rate_limit.enabled = rate_enabled;

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::source::MemoryConfigSource;
    use serde_json::json;

    fn resolver_with(values: &[(&str, Value)]) -> (Arc<MemoryConfigSource>, ConfigResolver) {
        let source = Arc::new(MemoryConfigSource::new());
        for (key, value) in values {
            source.set(*key, value.clone());
        }
        let resolver = ConfigResolver::new(source.clone());
        (source, resolver)
    }

    #[test]
    fn test_defaults_without_settings() {
        let (_, resolver) = resolver_with(&[]);
        let config = resolver.resolve();

        assert_eq!(config.query_depth_limit, 8);
        assert_eq!(config.query_complexity_limit, 100);
        assert_eq!(config.query_timeout_seconds, 30);
        assert!(!config.introspection_enabled);
        assert_eq!(config.batch_limit, 10);
        assert_eq!(config.alias_limit, 20);
        assert_eq!(config.directive_limit, 15);
        assert_eq!(config.field_duplicate_limit, 10);
        assert_eq!(config.rate_limit.requests_per_minute, 160);
        assert_eq!(config.rate_limit.burst_limit, 240);
        assert!(config.rate_limit.enabled);
    }

    #[test]
    fn test_execution_limit_caps_timeout() {
        let (_, resolver) = resolver_with(&[(keys::MAX_EXECUTION_TIME, json!(12))]);
        assert_eq!(resolver.resolve().query_timeout_seconds, 12);

        let (_, resolver) = resolver_with(&[(keys::MAX_EXECUTION_TIME, json!("120"))]);
        assert_eq!(resolver.resolve().query_timeout_seconds, 30);

        let (_, resolver) = resolver_with(&[(keys::MAX_EXECUTION_TIME, json!(0))]);
        assert_eq!(resolver.resolve().query_timeout_seconds, 30);
    }

    #[test]
    fn test_headless_profile_widens_limits() {
        let (_, resolver) = resolver_with(&[(keys::HEADLESS_MODE, json!("on"))]);
        let config = resolver.resolve();

        assert!(config.headless_mode);
        assert_eq!(config.query_depth_limit, 15);
        assert_eq!(config.query_complexity_limit, 200);
        assert_eq!(config.query_timeout_seconds, 10);
        assert_eq!(config.alias_limit, 50);
        assert_eq!(config.directive_limit, 30);
        assert_eq!(config.field_duplicate_limit, 20);
        assert_eq!(config.rate_limit.requests_per_minute, 220);
        assert_eq!(config.rate_limit.burst_limit, 330);
    }

    #[test]
    fn test_headless_keeps_explicit_timeout_and_higher_limits() {
        let (_, resolver) = resolver_with(&[
            (keys::HEADLESS_MODE, json!(true)),
            (keys::QUERY_TIMEOUT, json!(25)),
            (keys::QUERY_COMPLEXITY_LIMIT, json!(500)),
        ]);
        let config = resolver.resolve();

        assert_eq!(config.query_timeout_seconds, 25);
        assert_eq!(config.query_complexity_limit, 500);
    }

    #[test]
    fn test_headless_never_narrows_adaptive_limits() {
        let inputs = [
            vec![],
            vec![(keys::QUERY_DEPTH_LIMIT, json!(18))],
            vec![(keys::QUERY_COMPLEXITY_LIMIT, json!(900))],
            vec![(
                keys::HOST_GRAPHQL_SETTINGS,
                json!({"query_depth_enabled": "on", "query_depth_max": "6"}),
            )],
            vec![(keys::QUERY_DEPTH_LIMIT, json!("garbage"))],
        ];

        for settings in inputs {
            let (source, resolver) = resolver_with(&settings);
            let standard = resolver.resolve();

            source.set(keys::HEADLESS_MODE, json!(true));
            let headless = resolver.resolve();

            assert!(headless.alias_limit >= standard.alias_limit);
            assert!(headless.directive_limit >= standard.directive_limit);
            assert!(headless.field_duplicate_limit >= standard.field_duplicate_limit);
            assert!(headless.query_depth_limit >= standard.query_depth_limit);
            assert!(headless.query_complexity_limit >= standard.query_complexity_limit);
        }
    }

    #[test]
    fn test_malformed_input_is_clamped_into_range() {
        let (_, resolver) = resolver_with(&[
            (keys::QUERY_DEPTH_LIMIT, json!(500)),
            (keys::QUERY_COMPLEXITY_LIMIT, json!(3)),
            (keys::QUERY_TIMEOUT, json!(3600)),
        ]);
        let config = resolver.resolve();
        assert_eq!(config.query_depth_limit, 20);
        assert_eq!(config.query_complexity_limit, 10);
        assert_eq!(config.query_timeout_seconds, 30);

        let (_, resolver) = resolver_with(&[
            (keys::QUERY_DEPTH_LIMIT, json!(-3)),
            (keys::QUERY_COMPLEXITY_LIMIT, json!("lots")),
            (keys::QUERY_TIMEOUT, json!(null)),
            (keys::BATCH_LIMIT, json!({"nested": true})),
        ]);
        let config = resolver.resolve();
        assert_eq!(config.query_depth_limit, 8);
        assert_eq!(config.query_complexity_limit, 100);
        assert_eq!(config.query_timeout_seconds, 30);
        assert_eq!(config.batch_limit, 10);
    }

    #[test]
    fn test_resolved_invariants_hold_for_arbitrary_values() {
        let samples = [
            json!(0),
            json!(1),
            json!(19),
            json!(20),
            json!(21),
            json!(1001),
            json!(u32::MAX),
            json!("9999999999999"),
            json!(1.5),
            json!(false),
        ];

        for depth in &samples {
            for complexity in &samples {
                for timeout in &samples {
                    let (_, resolver) = resolver_with(&[
                        (keys::QUERY_DEPTH_LIMIT, depth.clone()),
                        (keys::QUERY_COMPLEXITY_LIMIT, complexity.clone()),
                        (keys::QUERY_TIMEOUT, timeout.clone()),
                        (keys::MAX_EXECUTION_TIME, timeout.clone()),
                    ]);
                    let config = resolver.resolve();

                    assert!((1..=20).contains(&config.query_depth_limit));
                    assert!((10..=1000).contains(&config.query_complexity_limit));
                    assert!((1..=30).contains(&config.query_timeout_seconds));
                    assert!(config.alias_limit > 0);
                    assert!(config.directive_limit > 0);
                    assert!(config.field_duplicate_limit > 0);
                    assert!(config.batch_limit > 0);
                }
            }
        }
    }

    #[test]
    fn test_native_settings_override_local() {
        let (_, resolver) = resolver_with(&[
            (keys::INTROSPECTION_ENABLED, json!(false)),
            (keys::BATCH_LIMIT, json!(4)),
            (
                keys::HOST_GRAPHQL_SETTINGS,
                json!({
                    "public_introspection_enabled": "on",
                    "batch_queries_enabled": "off",
                    "batch_limit": "25",
                    "restrict_endpoint_to_logged_in_users": "on",
                    "debug_mode_enabled": "off"
                }),
            ),
        ]);
        let config = resolver.resolve();

        assert!(config.introspection_enabled);
        assert!(!config.batch_enabled);
        assert_eq!(config.batch_limit, 25);
        assert_eq!(config.endpoint_access, EndpointAccess::Restricted);
        assert!(!config.debug_mode);
        // batching disabled removes the batch bonus
        assert_eq!(config.rate_limit.requests_per_minute, 60);
    }

    #[test]
    fn test_more_restrictive_native_depth_wins() {
        let (_, resolver) = resolver_with(&[
            (keys::QUERY_DEPTH_LIMIT, json!(12)),
            (
                keys::HOST_GRAPHQL_SETTINGS,
                json!({"query_depth_enabled": "on", "query_depth_max": 6}),
            ),
        ]);
        assert_eq!(resolver.resolve().query_depth_limit, 6);

        // A looser host ceiling never widens the local limit
        let (_, resolver) = resolver_with(&[
            (keys::QUERY_DEPTH_LIMIT, json!(5)),
            (
                keys::HOST_GRAPHQL_SETTINGS,
                json!({"query_depth_enabled": "on", "query_depth_max": 11}),
            ),
        ]);
        assert_eq!(resolver.resolve().query_depth_limit, 5);

        // Disabled host depth limiting is ignored
        let (_, resolver) = resolver_with(&[(
            keys::HOST_GRAPHQL_SETTINGS,
            json!({"query_depth_enabled": "off", "query_depth_max": 2}),
        )]);
        assert_eq!(resolver.resolve().query_depth_limit, 8);
    }

    #[test]
    fn test_non_object_native_settings_are_ignored() {
        assert!(NativeSettings::from_value(&json!("on")).is_none());
        assert!(NativeSettings::from_value(&json!(null)).is_none());

        let native = NativeSettings::from_value(&json!({})).unwrap();
        assert_eq!(native, NativeSettings::default());
        assert_eq!(native.depth_ceiling(), None);
    }

    #[test]
    fn test_cache_reused_until_source_changes() {
        let (source, resolver) = resolver_with(&[]);

        let first = resolver.resolve();
        let second = resolver.resolve();
        assert!(Arc::ptr_eq(&first, &second));

        source.set(keys::HEADLESS_MODE, json!(true));
        let third = resolver.resolve();
        assert!(!Arc::ptr_eq(&first, &third));
        assert!(third.headless_mode);
    }

    #[test]
    fn test_invalidate_forces_recompute() {
        let (_, resolver) = resolver_with(&[]);
        let first = resolver.resolve();

        resolver.invalidate();
        let second = resolver.resolve();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn test_rate_limit_can_be_disabled() {
        let (_, resolver) = resolver_with(&[(keys::RATE_LIMIT_ENABLED, json!("no"))]);
        assert!(!resolver.resolve().rate_limit.enabled);
    }

    #[test]
    fn test_rate_policy_batch_bonus_is_capped() {
        assert_eq!(RateLimitPolicy::derive(false, true, 50).requests_per_minute, 160);
        assert_eq!(RateLimitPolicy::derive(false, true, 3).requests_per_minute, 90);
        assert_eq!(RateLimitPolicy::derive(true, false, 3).requests_per_minute, 120);
        assert_eq!(RateLimitPolicy::derive(true, false, 3).burst_limit, 180);
    }

    #[test]
    fn test_security_score_ratings() {
        let mut config = EffectiveConfig::standard();
        // introspection off, debug off, depth 8, batch 10 -> 7 points
        assert_eq!(config.security_score().points, 7);
        assert_eq!(config.security_score().rating, SecurityRating::Medium);

        config.endpoint_access = EndpointAccess::Restricted;
        assert_eq!(config.security_score().points, 10);
        assert_eq!(config.security_score().rating, SecurityRating::High);

        config.endpoint_access = EndpointAccess::Public;
        config.introspection_enabled = true;
        config.debug_mode = true;
        config.batch_limit = 50;
        assert_eq!(config.security_score().points, 2);
        assert_eq!(config.security_score().rating, SecurityRating::Low);
    }

    #[test]
    fn test_resolver_score_reflects_settings() {
        let (_, resolver) = resolver_with(&[(keys::ENDPOINT_ACCESS, json!("restricted"))]);
        assert_eq!(resolver.security_score().rating, SecurityRating::High);
    }
}
