use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use graphql_query_guard::config::{AppConfig, Cli, EffectiveConfig};
use graphql_query_guard::guard::{ClientIdentity, RateLimiter};
use graphql_query_guard::store::MemoryCounterStore;
use graphql_query_guard::{AppState, check_query_file, create_router};

fn app_with(settings: Value) -> (Router, AppState) {
    let mut config = AppConfig::default();
    if let Value::Object(map) = settings {
        config.settings = map.into_iter().collect();
    }
    let state = AppState::new(&config);
    (create_router(state.clone(), &config.health), state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn inspect(app: &Router, query: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/inspect",
        Some(json!({"query": query, "client_ip": "203.0.113.9"})),
    )
    .await
}

#[tokio::test]
async fn test_inspect_allows_ordinary_query() {
    let (app, _) = app_with(json!({}));
    let (status, body) = inspect(&app, "query { posts { nodes { id title } } }").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allow"], true);
    assert_eq!(body["reason"], "ok");
    assert!(body.get("response").is_none());
}

#[tokio::test]
async fn test_inspect_rejects_with_error_envelope() {
    let (app, state) = app_with(json!({}));
    let (status, body) = inspect(&app, "{ __schema { types { name } } }").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["allow"], false);
    assert_eq!(body["reason"], "introspection_blocked");
    assert_eq!(
        body["response"]["errors"][0]["extensions"]["code"],
        "INTROSPECTION_BLOCKED"
    );
    assert_eq!(body["response"]["errors"][0]["message"], "GraphQL introspection is disabled");
    assert_eq!(state.guard.recent_blocks().await, 1);
}

#[tokio::test]
async fn test_production_flag_per_request() {
    let (app, _) = app_with(json!({}));
    let (status, _) = send(
        &app,
        Method::POST,
        "/inspect",
        Some(json!({"query": "{ __schema { types { name } } }", "production": false})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limited_client_gets_429() {
    let (app, _) = app_with(json!({ "batch_enabled": false }));

    for _ in 0..60 {
        let (status, _) = inspect(&app, "{ posts { id } }").await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = inspect(&app, "{ posts { id } }").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["response"]["errors"][0]["extensions"]["code"], "RATE_LIMITED");

    // Another address still has its own window
    let (status, _) = send(
        &app,
        Method::POST,
        "/inspect",
        Some(json!({"query": "{ posts { id } }", "client_ip": "198.51.100.1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_finalize_appends_timeout_error() {
    let (app, _) = app_with(json!({ "query_timeout": 5 }));
    let executed = json!({"data": {"posts": [{"id": 1}]}});

    let (status, body) = send(
        &app,
        Method::POST,
        "/finalize",
        Some(json!({"response": executed, "elapsed_seconds": 12.0})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"posts": [{"id": 1}]}));
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    assert_eq!(body["errors"][0]["extensions"]["code"], "QUERY_TIMEOUT");

    let (status, body) = send(
        &app,
        Method::POST,
        "/finalize",
        Some(json!({"response": executed, "elapsed_seconds": 1.5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("errors").is_none());
}

#[tokio::test]
async fn test_finalize_rejects_negative_elapsed() {
    let (app, _) = app_with(json!({}));
    let (status, body) = send(
        &app,
        Method::POST,
        "/finalize",
        Some(json!({"response": {"data": null}, "elapsed_seconds": -1.0})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("elapsed_seconds"));
}

#[tokio::test]
async fn test_settings_update_changes_decisions() {
    let (app, _) = app_with(json!({}));

    let (_, body) = send(&app, Method::GET, "/config", None).await;
    assert_eq!(body["config"]["query_depth_limit"], 8);
    assert_eq!(body["production"], true);
    assert!(body["security_score"]["points"].is_number());

    let deep = "{ a { b { c { d { e { f { g { h { i { j } } } } } } } } } }";
    let (status, _) = inspect(&app, deep).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/settings",
        Some(json!({ "headless_mode": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"]["headless_mode"], true);
    assert_eq!(body["config"]["query_depth_limit"], 15);

    let (status, _) = inspect(&app, deep).await;
    assert_eq!(status, StatusCode::OK);

    let (_, events) = send(&app, Method::GET, "/events?limit=10", None).await;
    let changed = events
        .as_array()
        .unwrap()
        .iter()
        .find(|event| event["event_type"] == "config_changed")
        .expect("config change recorded");
    assert_eq!(changed["context"]["keys"], json!(["headless_mode"]));
}

#[tokio::test]
async fn test_settings_must_be_an_object() {
    let (app, _) = app_with(json!({}));
    let (status, _) = send(&app, Method::PUT, "/settings", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalidate_and_stats() {
    let (app, _) = app_with(json!({}));

    let (status, _) = send(&app, Method::POST, "/config/invalidate", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    inspect(&app, "{ posts { id id id } }").await;
    inspect(&app, "{ posts { id } }").await;

    let (status, body) = send(&app, Method::GET, "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recent_blocks"], 1);
    assert!(body["store"]["entries"].as_u64().unwrap() >= 2);
}

#[tokio::test]
async fn test_health_endpoints_and_request_id() {
    let (app, state) = app_with(json!({}));
    state.health.mark_ready().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-1");

    let (status, body) = send(&app, Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["counter_store"]["status"], "healthy");
}

#[tokio::test]
async fn test_parallel_checks_never_exceed_limit() {
    let limiter = Arc::new(RateLimiter::new(Arc::new(MemoryCounterStore::default())));
    let mut config = EffectiveConfig::standard();
    config.rate_limit.requests_per_minute = 25;
    let config = Arc::new(config);

    let tasks: Vec<_> = (0..100)
        .map(|_| {
            let limiter = limiter.clone();
            let config = config.clone();
            tokio::spawn(async move {
                limiter
                    .allow(&ClientIdentity::new("192.0.2.44", None), &config)
                    .await
            })
        })
        .collect();

    let allowed = futures::future::join_all(tasks)
        .await
        .into_iter()
        .filter(|result| matches!(result, Ok(true)))
        .count();

    assert_eq!(allowed, 25);
}

#[tokio::test]
async fn test_check_query_file() {
    let dir = tempfile::tempdir().unwrap();
    let query_file = dir.path().join("query.graphql");
    std::fs::write(&query_file, "query { a: posts { id } b: posts { id } }").unwrap();

    let cli = Cli {
        environment: Some("production".to_string()),
        ..Default::default()
    };
    let decision = check_query_file(&cli, &query_file).await.unwrap();
    assert!(decision.allow);

    std::fs::write(&query_file, "{ __type(name: \"Post\") { name } }").unwrap();
    let decision = check_query_file(&cli, &query_file).await.unwrap();
    assert!(!decision.allow);
    assert_eq!(decision.code(), Some("INTROSPECTION_BLOCKED"));

    let missing = dir.path().join("absent.graphql");
    assert!(check_query_file(&cli, &missing).await.is_err());
}
