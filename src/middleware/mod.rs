use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Route label for requests that matched no route
const UNMATCHED_PATH: &str = "unmatched";

/// Middleware to record HTTP request metrics, labelled by route template
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string());

    let response = next.run(req).await;
    let status = response.status().as_u16();

    record_http_request(&method, &path, status, start.elapsed());

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::recorder::init_test_metrics;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn,
        routing::get,
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_records_route_template() {
        let manager = init_test_metrics();

        let app = Router::new()
            .route("/items/{id}", get(|| async { "ok" }))
            .route_layer(from_fn(metrics_middleware));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/items/9f1c2a")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let output = manager.render();
        assert!(output.contains("path=\"/items/{id}\""));
        assert!(!output.contains("9f1c2a"));
    }
}
