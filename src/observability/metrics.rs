//! Metric recording helpers
//!
//! Label values come from closed sets (decision reasons, rate-limit
//! outcomes, matched route templates, status buckets) so cardinality stays
//! bounded. Client identifiers never appear in labels.
//!
//! Without an installed recorder every call is a no-op.

use metrics::{counter, histogram};
use std::time::Duration;

use crate::guard::DecisionReason;

/// Bucket HTTP status codes to control cardinality
pub fn bucket_status_code(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

pub fn record_guard_decision(reason: DecisionReason) {
    counter!("graphql_guard_decisions_total", "reason" => reason.as_str()).increment(1);
}

pub fn record_query_length(length: usize) {
    histogram!("graphql_guard_query_length_bytes").record(length as f64);
}

/// `result` is one of allowed, limited, bypassed
pub fn record_rate_limit_check(result: &'static str) {
    counter!("graphql_guard_rate_limit_total", "result" => result).increment(1);
}

pub fn record_query_timeout() {
    counter!("graphql_guard_timeouts_total").increment(1);
}

/// `path` must be a route template, not the raw request path
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let status_bucket = bucket_status_code(status_code);

    counter!(
        "http_request_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_bucket
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_bucket
    )
    .record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::recorder::init_test_metrics;

    #[test]
    fn test_guard_metrics_are_rendered() {
        let manager = init_test_metrics();

        record_guard_decision(DecisionReason::TooManyAliases);
        record_query_length(512);
        record_rate_limit_check("limited");
        record_query_timeout();

        let output = manager.render();
        assert!(output.contains("graphql_guard_decisions_total"));
        assert!(output.contains("reason=\"too_many_aliases\""));
        assert!(output.contains("graphql_guard_query_length_bytes"));
        assert!(output.contains("result=\"limited\""));
        assert!(output.contains("graphql_guard_timeouts_total"));
    }

    #[test]
    fn test_http_request_metrics() {
        let manager = init_test_metrics();

        record_http_request("POST", "/inspect", 429, Duration::from_millis(3));

        let output = manager.render();
        assert!(output.contains("http_request_total"));
        assert!(output.contains("http_request_duration_seconds"));
        assert!(output.contains("path=\"/inspect\""));
        assert!(output.contains("status=\"4xx\""));
    }

    #[test]
    fn test_status_code_bucketing() {
        assert_eq!(bucket_status_code(200), "2xx");
        assert_eq!(bucket_status_code(304), "3xx");
        assert_eq!(bucket_status_code(429), "4xx");
        assert_eq!(bucket_status_code(503), "5xx");
        assert_eq!(bucket_status_code(100), "other");
        assert_eq!(bucket_status_code(600), "other");
    }
}
