//! Request lifecycle around query execution
//!
//! ```text
//! RECEIVED ──rate limit──> VALIDATED ──checks──> EXECUTING ──> COMPLETED
//!     │                        │
//!     └──────> REJECTED <──────┘
//! ```
//!
//! Validation short-circuits in a fixed order so that the reported reason
//! for a query violating several limits is deterministic. The timeout is
//! advisory: execution is never interrupted, the response is annotated
//! afterwards.

pub mod analyzer;
pub mod decision;
pub mod errors;
pub mod extension;
pub mod rate_limit;
pub mod response;

pub use analyzer::*;
pub use decision::*;
pub use errors::*;
pub use extension::*;
pub use rate_limit::*;
pub use response::*;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{ConfigResolver, EffectiveConfig};
use crate::events::{EventSink, SecurityEvent, SecurityEventType, record_best_effort};
use crate::logging::sanitize_log_message;
use crate::observability::{record_guard_decision, record_query_length, record_query_timeout};
use crate::store::CounterStore;

/// Counter of rejected requests, kept for five minutes
pub const BLOCKED_COUNTER_KEY: &str = "graphql_guard_blocked_requests";
pub const BLOCKED_COUNTER_TTL: Duration = Duration::from_secs(300);

const PREVIEW_CHARS: usize = 200;
const TIMEOUT_CODE: &str = "QUERY_TIMEOUT";

/// Hooks the host calls around execution
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// Decide before execution
    async fn inspect(&self, raw_query: &str, client: &ClientIdentity, is_production: bool)
        -> GuardDecision;

    /// Annotate the executed response
    fn finalize(&self, response: GraphQLResponse, elapsed: Duration) -> GraphQLResponse;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Received,
    Validated,
    Executing,
    Completed,
    Rejected,
}

impl RequestState {
    fn can_become(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Received, Validated)
                | (Validated, Executing)
                | (Executing, Completed)
                | (Received, Rejected)
                | (Validated, Rejected)
        )
    }
}

/// One admitted request, from inspection until its response is finalized
#[derive(Debug, Clone)]
pub struct GuardedRequest {
    state: RequestState,
    started_at: Instant,
    timeout: Duration,
    signature: Option<QuerySignature>,
}

impl GuardedRequest {
    fn received(config: &EffectiveConfig) -> Self {
        Self {
            state: RequestState::Received,
            started_at: Instant::now(),
            timeout: Duration::from_secs(u64::from(config.query_timeout_seconds)),
            signature: None,
        }
    }

    fn advance(&mut self, next: RequestState) {
        debug_assert!(
            self.state.can_become(next),
            "invalid request transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn signature(&self) -> Option<&QuerySignature> {
        self.signature.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time since the request was received
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

pub struct QueryGuard {
    resolver: Arc<ConfigResolver>,
    limiter: RateLimiter,
    store: Arc<dyn CounterStore>,
    analyzer: PatternAnalyzer,
    events: Arc<dyn EventSink>,
}

impl QueryGuard {
    pub fn new(
        resolver: Arc<ConfigResolver>,
        store: Arc<dyn CounterStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            resolver,
            limiter: RateLimiter::new(store.clone()),
            store,
            analyzer: PatternAnalyzer::new(),
            events,
        }
    }

    pub fn resolver(&self) -> &Arc<ConfigResolver> {
        &self.resolver
    }

    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    pub fn analyzer(&self) -> &PatternAnalyzer {
        &self.analyzer
    }

    /// Pre-execution decision for `raw_query`
    pub async fn inspect(
        &self,
        raw_query: &str,
        client: &ClientIdentity,
        is_production: bool,
    ) -> GuardDecision {
        match self.admit(raw_query, client, is_production).await {
            Ok(_) => GuardDecision::allowed(),
            Err(e) => GuardDecision::rejected(&e),
        }
    }

    /// Run the pre-execution checks and, if they pass, start tracking the
    /// request. The returned request is in the EXECUTING state.
    pub async fn admit(
        &self,
        raw_query: &str,
        client: &ClientIdentity,
        is_production: bool,
    ) -> Result<GuardedRequest, GuardError> {
        let config = self.resolver.resolve();
        let mut request = GuardedRequest::received(&config);

        if raw_query.trim().is_empty() {
            request.advance(RequestState::Validated);
            request.advance(RequestState::Executing);
            return Ok(request);
        }

        let rate = self.limiter.check(client, &config).await;
        if let RateLimitResult::Limited(window) = &rate {
            let error = GuardError::RateLimited {
                count: window.count,
                limit: window.limit,
                window_seconds: window.window_seconds,
            };
            return Err(self.reject(&mut request, error, client, None).await);
        }
        request.advance(RequestState::Validated);

        let signature = self.analyzer.analyze(raw_query);
        record_query_length(signature.length);

        if let Err(error) = validate(&signature, &config, is_production) {
            return Err(self.reject(&mut request, error, client, Some(&signature)).await);
        }

        self.flag_if_suspicious(&signature, &config, client);

        record_guard_decision(DecisionReason::Ok);
        request.signature = Some(signature);
        request.advance(RequestState::Executing);
        Ok(request)
    }

    /// Append a timeout error when `elapsed` exceeded the configured limit
    pub fn finalize(&self, mut response: GraphQLResponse, elapsed: Duration) -> GraphQLResponse {
        if response.has_error_code(TIMEOUT_CODE) {
            return response;
        }

        let config = self.resolver.resolve();
        if let Some(error) = self.timeout_violation(elapsed, config.query_timeout_seconds) {
            response.errors.push(error.to_error_entry());
        }
        response
    }

    /// Finalize an admitted request using its own start time and the limit
    /// in force when it was admitted
    pub fn complete(&self, request: GuardedRequest, mut response: GraphQLResponse) -> GraphQLResponse {
        if response.has_error_code(TIMEOUT_CODE) {
            return response;
        }

        if let Some(error) = self.close(request) {
            response.errors.push(error.to_error_entry());
        }
        response
    }

    /// Mark an admitted request completed, returning the timeout error it
    /// earned, if any
    pub fn close(&self, mut request: GuardedRequest) -> Option<GuardError> {
        let elapsed = request.elapsed();
        let limit_seconds = u32::try_from(request.timeout.as_secs()).unwrap_or(u32::MAX);
        request.advance(RequestState::Completed);
        self.timeout_violation(elapsed, limit_seconds)
    }

    /// Requests rejected during the last few minutes
    pub async fn recent_blocks(&self) -> u64 {
        match self.store.get(BLOCKED_COUNTER_KEY).await {
            Ok(count) => count.unwrap_or(0),
            Err(e) => {
                warn!(error = %e, "Failed to read blocked request counter");
                0
            }
        }
    }

    fn timeout_violation(&self, elapsed: Duration, limit_seconds: u32) -> Option<GuardError> {
        if elapsed <= Duration::from_secs(u64::from(limit_seconds)) {
            return None;
        }

        let error = GuardError::Timeout {
            elapsed,
            limit_seconds,
        };

        warn!(
            elapsed_ms = elapsed.as_millis() as u64,
            limit_seconds, "GraphQL query exceeded the execution time limit"
        );
        record_query_timeout();
        record_guard_decision(DecisionReason::TimeoutExceeded);
        record_best_effort(
            self.events.as_ref(),
            SecurityEvent::new(SecurityEventType::QueryTimeout, error.to_string())
                .with("elapsed_seconds", elapsed.as_secs_f64())
                .with("limit_seconds", limit_seconds),
        );

        Some(error)
    }

    async fn reject(
        &self,
        request: &mut GuardedRequest,
        error: GuardError,
        client: &ClientIdentity,
        signature: Option<&QuerySignature>,
    ) -> GuardError {
        let from_state = request.state;
        request.advance(RequestState::Rejected);

        let reason = error.reason();
        record_guard_decision(reason);

        info!(
            reason = reason.as_str(),
            from_state = ?from_state,
            detail = %error,
            "GraphQL request rejected"
        );

        let event_type = if reason == DecisionReason::RateLimited {
            SecurityEventType::RateLimited
        } else {
            SecurityEventType::QueryRejected
        };
        let mut event = SecurityEvent::new(event_type, error.to_string())
            .with("reason", reason.as_str())
            .with("client_key", client.client_key(self.limiter.purpose()));
        if let Some(signature) = signature {
            event = event
                .with("query_length", signature.length)
                .with("query_preview", sanitize_log_message(&signature.preview(PREVIEW_CHARS)));
        }
        record_best_effort(self.events.as_ref(), event);

        if let Err(e) = self
            .store
            .increment_below(BLOCKED_COUNTER_KEY, u64::MAX, BLOCKED_COUNTER_TTL)
            .await
        {
            debug!(error = %e, "Failed to update blocked request counter");
        }

        error
    }

    // Never fails the request: logging errors are swallowed by the sink helper.
    fn flag_if_suspicious(
        &self,
        signature: &QuerySignature,
        config: &EffectiveConfig,
        client: &ClientIdentity,
    ) {
        let indicators = self.analyzer.suspicion_indicators(signature, config);
        if indicators.is_empty() {
            return;
        }

        let labels: Vec<&str> = indicators.iter().map(|i| i.as_str()).collect();
        let preview = sanitize_log_message(&signature.preview(PREVIEW_CHARS));
        let timestamp = Utc::now();

        warn!(
            query_length = signature.length,
            indicators = ?labels,
            preview = %preview,
            timestamp = %timestamp.to_rfc3339(),
            "Suspicious GraphQL query allowed"
        );

        record_best_effort(
            self.events.as_ref(),
            SecurityEvent::new(SecurityEventType::SuspiciousQuery, "Suspicious GraphQL query allowed")
                .with("query_length", signature.length)
                .with("indicators", labels)
                .with("query_preview", preview)
                .with("client_key", client.client_key(self.limiter.purpose())),
        );
    }
}

#[async_trait]
impl RequestInterceptor for QueryGuard {
    async fn inspect(
        &self,
        raw_query: &str,
        client: &ClientIdentity,
        is_production: bool,
    ) -> GuardDecision {
        QueryGuard::inspect(self, raw_query, client, is_production).await
    }

    fn finalize(&self, response: GraphQLResponse, elapsed: Duration) -> GraphQLResponse {
        QueryGuard::finalize(self, response, elapsed)
    }
}

/// Validation checks in their fixed order. The first failing check wins.
pub fn validate(
    signature: &QuerySignature,
    config: &EffectiveConfig,
    is_production: bool,
) -> Result<(), GuardError> {
    if is_production && !config.introspection_enabled && signature.is_introspection {
        return Err(GuardError::IntrospectionBlocked);
    }

    if signature.alias_count > config.alias_limit {
        return Err(GuardError::TooManyAliases {
            count: signature.alias_count,
            limit: config.alias_limit,
        });
    }

    let directive_ceiling = config.directive_limit.saturating_mul(2);
    if signature.directive_count > directive_ceiling {
        return Err(GuardError::TooManyDirectives {
            count: signature.directive_count,
            limit: directive_ceiling,
        });
    }

    if signature.has_duplicate_fields {
        return Err(GuardError::FieldDuplication {
            repeats: signature.max_field_repeats,
        });
    }

    if signature.exceeds_depth(config.query_depth_limit) {
        return Err(GuardError::DepthExceeded {
            depth: signature.nesting_depth,
            limit: config.query_depth_limit,
        });
    }

    let max_length = max_query_length(config);
    if signature.length > max_length {
        return Err(GuardError::QueryTooLong {
            length: signature.length,
            limit: max_length,
        });
    }

    if config.strict_validation && signature.estimated_complexity > config.query_complexity_limit {
        return Err(GuardError::ComplexityExceeded {
            complexity: signature.estimated_complexity,
            limit: config.query_complexity_limit,
        });
    }

    Ok(())
}
