use axum::{
    extract::ConnectInfo,
    http::{Extensions, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use super::recorder::{extract_client_ip, get_metrics_manager};
use crate::error::AppError;

/// Prometheus scrape endpoint, restricted by the configured IP allowlist.
///
/// The peer address is taken from proxy headers first, then from the
/// connection when the server was started with connect info.
pub async fn metrics_endpoint(
    headers: HeaderMap,
    extensions: Extensions,
) -> Result<Response, AppError> {
    let manager = get_metrics_manager().map_err(|e| {
        tracing::error!("Metrics manager not initialized: {}", e);
        AppError::ServiceUnavailable("metrics not available".to_string())
    })?;

    let client_ip = extract_client_ip(&headers)
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string());

    if !manager.is_ip_allowed(&client_ip) {
        tracing::warn!(client_ip = %client_ip, "Metrics access denied: IP not in allowlist");
        return Err(AppError::Forbidden("IP not authorized".to_string()));
    }

    let metrics_content = manager.render();

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        metrics_content,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::recorder::init_test_metrics;
    use axum::http::HeaderValue;
    use std::net::{IpAddr, Ipv4Addr};

    #[tokio::test]
    async fn test_allowed_ip_from_connection() {
        init_test_metrics();

        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            40000,
        )));

        let response = metrics_endpoint(HeaderMap::new(), extensions).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; version=0.0.4; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_denied_ip_from_header() {
        init_test_metrics();

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("192.168.1.1"));

        let err = metrics_endpoint(headers, Extensions::new()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_peer_is_denied_with_allowlist() {
        init_test_metrics();

        let err = metrics_endpoint(HeaderMap::new(), Extensions::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
