//! HTTP adapters - REST API implementations.
//!
//! `api_router` assembles the chat and health routes and applies the
//! cross-cutting layers: request tracing, CORS and a per-request timeout.

pub mod brief;
pub mod health;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

// Re-export key types for convenience
pub use brief::{brief_routes, BriefHandlers, ChatRequest, ChatResponse, ErrorResponse};
pub use health::health_routes;

/// Builds the full application router.
pub fn api_router(handlers: BriefHandlers, server: &ServerConfig) -> Router {
    Router::new()
        .merge(brief_routes(handlers))
        .merge(health_routes())
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(cors_layer(server))
        .layer(TraceLayer::new_for_http())
}

/// Allows the configured origins. With none configured, any origin is
/// allowed outside production and none in production.
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if !origins.is_empty() {
        layer.allow_origin(AllowOrigin::list(origins))
    } else if server.is_production() {
        layer
    } else {
        layer.allow_origin(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::storage::InMemorySessionStore;
    use crate::application::{
        BackoffExecutor, ModelGateway, PersistenceBridge, ProcessTurnHandler, RetryPolicy,
    };
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn router(server: &ServerConfig) -> Router {
        let store = Arc::new(InMemorySessionStore::new());
        let handler = ProcessTurnHandler::new(
            store.clone(),
            ModelGateway::new(Arc::new(MockAIProvider::new()), 0.2),
            BackoffExecutor::new(RetryPolicy::new(1, Duration::ZERO)),
            PersistenceBridge::new(store, None),
        );
        api_router(BriefHandlers::new(Arc::new(handler)), server)
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/chat")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn router_serves_health() {
        let response = router(&ServerConfig::default())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = router(&ServerConfig::default())
            .oneshot(Request::builder().uri("/api/other").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn configured_origin_is_allowed() {
        let server = ServerConfig {
            cors_origins: Some("http://localhost:5173".to_string()),
            ..Default::default()
        };

        let response = router(&server)
            .oneshot(preflight("http://localhost:5173"))
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("http://localhost:5173"))
        );
    }

    #[tokio::test]
    async fn unlisted_origin_gets_no_allow_header() {
        let server = ServerConfig {
            cors_origins: Some("http://localhost:5173".to_string()),
            ..Default::default()
        };

        let response = router(&server)
            .oneshot(preflight("http://evil.example"))
            .await
            .unwrap();

        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
