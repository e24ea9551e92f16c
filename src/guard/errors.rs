use async_graphql::{Error as GraphQLError, ErrorExtensionValues, ErrorExtensions, ServerError};
use std::time::Duration;
use thiserror::Error;

use super::decision::DecisionReason;
use super::response::GraphQLErrorEntry;

/// Why the guard refused or flagged a request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("Rate limit exceeded ({count} requests). Maximum allowed: {limit} per {window_seconds} seconds")]
    RateLimited {
        count: u64,
        limit: u64,
        window_seconds: u64,
    },

    #[error("GraphQL introspection is disabled")]
    IntrospectionBlocked,

    #[error("Query contains too many aliases ({count}). Maximum allowed: {limit}")]
    TooManyAliases { count: u32, limit: u32 },

    #[error("Query contains too many directives ({count}). Maximum allowed: {limit}")]
    TooManyDirectives { count: u32, limit: u32 },

    #[error("Query contains excessive field duplication")]
    FieldDuplication { repeats: u32 },

    #[error("Query depth ({depth}) exceeds maximum allowed depth: {limit}")]
    DepthExceeded { depth: u32, limit: u32 },

    #[error("Query is too long ({length} bytes). Maximum allowed: {limit} bytes")]
    QueryTooLong { length: usize, limit: usize },

    #[error("Query complexity ({complexity}) exceeds maximum allowed: {limit}")]
    ComplexityExceeded { complexity: u32, limit: u32 },

    #[error(
        "Query execution exceeded the time limit ({:.1}s). Maximum allowed: {}s",
        .elapsed.as_secs_f64(),
        .limit_seconds
    )]
    Timeout { elapsed: Duration, limit_seconds: u32 },
}

impl GuardError {
    pub fn reason(&self) -> DecisionReason {
        match self {
            GuardError::RateLimited { .. } => DecisionReason::RateLimited,
            GuardError::IntrospectionBlocked => DecisionReason::IntrospectionBlocked,
            GuardError::TooManyAliases { .. } => DecisionReason::TooManyAliases,
            GuardError::TooManyDirectives { .. } => DecisionReason::TooManyDirectives,
            GuardError::FieldDuplication { .. } => DecisionReason::FieldDuplication,
            GuardError::DepthExceeded { .. } => DecisionReason::DepthExceeded,
            GuardError::QueryTooLong { .. } => DecisionReason::QueryTooLong,
            GuardError::ComplexityExceeded { .. } => DecisionReason::ComplexityExceeded,
            GuardError::Timeout { .. } => DecisionReason::TimeoutExceeded,
        }
    }

    /// Machine-readable code placed in `extensions.code`
    pub fn code(&self) -> &'static str {
        self.reason().code().unwrap_or("GUARD_ERROR")
    }

    pub fn to_error_entry(&self) -> GraphQLErrorEntry {
        GraphQLErrorEntry::with_code(self.to_string(), self.code())
    }

    /// Error for the async-graphql request pipeline
    pub fn to_server_error(&self) -> ServerError {
        let mut extensions = ErrorExtensionValues::default();
        extensions.set("code", self.code());

        let mut error = ServerError::new(self.to_string(), None);
        error.extensions = Some(extensions);
        error
    }
}

/// Helper trait to convert errors to GraphQL errors with proper codes
pub trait ToGraphQLError {
    fn to_graphql_error(self) -> GraphQLError;
}

impl ToGraphQLError for GuardError {
    fn to_graphql_error(self) -> GraphQLError {
        let code = self.code();
        GraphQLError::new(self.to_string()).extend_with(|_, e| e.set("code", code))
    }
}
