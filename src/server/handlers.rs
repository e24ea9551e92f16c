//! Sidecar endpoints: the host calls `/inspect` before executing a query
//! and `/finalize` with the executed response.

use axum::{
    Json,
    extract::{ConnectInfo, Query, State},
    http::{Extensions, HeaderMap, StatusCode, header::USER_AGENT},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

use super::AppState;
use crate::config::{EffectiveConfig, SecurityScore, keys};
use crate::error::AppError;
use crate::events::{SecurityEvent, SecurityEventType, record_best_effort};
use crate::guard::{
    BLOCKED_COUNTER_KEY, ClientIdentity, DecisionReason, GraphQLResponse, GuardDecision,
};
use crate::observability::extract_client_ip;
use crate::store::CounterStats;

const DEFAULT_EVENT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct InspectRequest {
    pub query: String,
    #[serde(default)]
    pub client_ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Overrides the server's production flag for this request
    #[serde(default)]
    pub production: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct InspectResponse {
    #[serde(flatten)]
    pub decision: GuardDecision,
    /// GraphQL error envelope to return to the client instead of executing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<GraphQLResponse>,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub response: GraphQLResponse,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Serialize)]
pub struct ConfigView {
    pub config: EffectiveConfig,
    pub security_score: SecurityScore,
    pub production: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsView {
    pub store: CounterStats,
    pub recent_blocks: u64,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

pub async fn inspect_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    Json(body): Json<InspectRequest>,
) -> Response {
    let client = client_identity(&body, &headers, &extensions);
    let production = body.production.unwrap_or(state.production);

    let decision = state.guard.inspect(&body.query, &client, production).await;

    let status = match decision.reason {
        DecisionReason::Ok => StatusCode::OK,
        DecisionReason::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::BAD_REQUEST,
    };
    let response = decision.error_response();

    (status, Json(InspectResponse { decision, response })).into_response()
}

pub async fn finalize_handler(
    State(state): State<AppState>,
    Json(body): Json<FinalizeRequest>,
) -> Result<Json<GraphQLResponse>, AppError> {
    let elapsed = Duration::try_from_secs_f64(body.elapsed_seconds).map_err(|_| {
        AppError::InvalidInput(format!(
            "elapsed_seconds must be a non-negative number, got {}",
            body.elapsed_seconds
        ))
    })?;

    Ok(Json(state.guard.finalize(body.response, elapsed)))
}

pub async fn config_handler(State(state): State<AppState>) -> Json<ConfigView> {
    Json(config_view(&state))
}

/// Merge a JSON object of settings into the live configuration source
pub async fn update_settings_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ConfigView>, AppError> {
    let Value::Object(updates) = body else {
        return Err(AppError::InvalidInput(
            "settings must be a JSON object".to_string(),
        ));
    };
    if updates.is_empty() {
        return Err(AppError::InvalidInput("no settings given".to_string()));
    }

    let changed: Vec<String> = updates.keys().cloned().collect();
    let toggles_headless = updates.contains_key(keys::HEADLESS_MODE);

    state.source.merge(updates.into_iter().collect());
    if toggles_headless {
        state.guard.resolver().invalidate();
    }

    info!(keys = ?changed, "GraphQL guard settings updated");
    record_best_effort(
        state.sink.as_ref(),
        SecurityEvent::new(SecurityEventType::ConfigChanged, "GraphQL guard settings updated")
            .with("keys", changed),
    );

    Ok(Json(config_view(&state)))
}

pub async fn invalidate_handler(State(state): State<AppState>) -> StatusCode {
    state.guard.resolver().invalidate();
    StatusCode::NO_CONTENT
}

pub async fn events_handler(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<SecurityEvent>> {
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    Json(state.events.recent(limit))
}

pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsView>, AppError> {
    let store = state.guard.store();
    let recent_blocks = store.get(BLOCKED_COUNTER_KEY).await?.unwrap_or(0);

    Ok(Json(StatsView {
        store: store.stats().await,
        recent_blocks,
    }))
}

fn config_view(state: &AppState) -> ConfigView {
    let config = state.guard.resolver().resolve();
    ConfigView {
        security_score: config.security_score(),
        config: config.as_ref().clone(),
        production: state.production,
    }
}

// Body fields win, then proxy headers, then the socket peer
fn client_identity(
    body: &InspectRequest,
    headers: &HeaderMap,
    extensions: &Extensions,
) -> ClientIdentity {
    let ip = body
        .client_ip
        .clone()
        .filter(|ip| !ip.trim().is_empty())
        .or_else(|| extract_client_ip(headers))
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

    let user_agent = body.user_agent.clone().or_else(|| {
        headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
    });

    match ip {
        Some(ip) => ClientIdentity::new(ip, user_agent),
        None => ClientIdentity {
            user_agent,
            ..ClientIdentity::unknown()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn inspect_request(client_ip: Option<&str>) -> InspectRequest {
        InspectRequest {
            query: "{ posts { id } }".to_string(),
            client_ip: client_ip.map(str::to_string),
            user_agent: None,
            production: None,
        }
    }

    #[test]
    fn test_client_ip_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.7"));
        headers.insert(USER_AGENT, HeaderValue::from_static("Gatsby/5.0"));

        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 5000))));

        let client = client_identity(&inspect_request(Some("203.0.113.5")), &headers, &extensions);
        assert_eq!(client.ip, "203.0.113.5");
        assert!(client.is_build_tool());

        let client = client_identity(&inspect_request(None), &headers, &extensions);
        assert_eq!(client.ip, "198.51.100.7");

        let client = client_identity(&inspect_request(None), &HeaderMap::new(), &extensions);
        assert_eq!(client.ip, "10.0.0.1");

        let client = client_identity(&inspect_request(None), &HeaderMap::new(), &Extensions::new());
        assert_eq!(client, ClientIdentity::unknown());
    }
}
