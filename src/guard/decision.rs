use serde::Serialize;

use super::errors::GuardError;
use super::response::GraphQLResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Ok,
    RateLimited,
    DepthExceeded,
    ComplexityExceeded,
    TooManyAliases,
    TooManyDirectives,
    FieldDuplication,
    QueryTooLong,
    IntrospectionBlocked,
    TimeoutExceeded,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::Ok => "ok",
            DecisionReason::RateLimited => "rate_limited",
            DecisionReason::DepthExceeded => "depth_exceeded",
            DecisionReason::ComplexityExceeded => "complexity_exceeded",
            DecisionReason::TooManyAliases => "too_many_aliases",
            DecisionReason::TooManyDirectives => "too_many_directives",
            DecisionReason::FieldDuplication => "field_duplication",
            DecisionReason::QueryTooLong => "query_too_long",
            DecisionReason::IntrospectionBlocked => "introspection_blocked",
            DecisionReason::TimeoutExceeded => "timeout_exceeded",
        }
    }

    /// Error code for non-ok reasons
    pub fn code(&self) -> Option<&'static str> {
        match self {
            DecisionReason::Ok => None,
            DecisionReason::RateLimited => Some("RATE_LIMITED"),
            DecisionReason::DepthExceeded => Some("DEPTH_EXCEEDED"),
            DecisionReason::ComplexityExceeded => Some("COMPLEXITY_EXCEEDED"),
            DecisionReason::TooManyAliases => Some("TOO_MANY_ALIASES"),
            DecisionReason::TooManyDirectives => Some("TOO_MANY_DIRECTIVES"),
            DecisionReason::FieldDuplication => Some("FIELD_DUPLICATION"),
            DecisionReason::QueryTooLong => Some("QUERY_TOO_LONG"),
            DecisionReason::IntrospectionBlocked => Some("INTROSPECTION_BLOCKED"),
            DecisionReason::TimeoutExceeded => Some("QUERY_TIMEOUT"),
        }
    }
}

/// Outcome of inspecting one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardDecision {
    pub allow: bool,
    pub reason: DecisionReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl GuardDecision {
    pub fn allowed() -> Self {
        Self {
            allow: true,
            reason: DecisionReason::Ok,
            detail: None,
        }
    }

    pub fn rejected(error: &GuardError) -> Self {
        Self {
            allow: false,
            reason: error.reason(),
            detail: Some(error.to_string()),
        }
    }

    pub fn code(&self) -> Option<&'static str> {
        self.reason.code()
    }

    /// GraphQL error envelope to return instead of executing, if rejected
    pub fn error_response(&self) -> Option<GraphQLResponse> {
        let code = self.code()?;
        let message = self.detail.clone().unwrap_or_else(|| code.to_string());
        Some(GraphQLResponse::from_error(
            super::response::GraphQLErrorEntry::with_code(message, code),
        ))
    }
}

impl From<Result<(), GuardError>> for GuardDecision {
    fn from(result: Result<(), GuardError>) -> Self {
        match result {
            Ok(()) => GuardDecision::allowed(),
            Err(e) => GuardDecision::rejected(&e),
        }
    }
}
