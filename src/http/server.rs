//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, metrics, rate limit,
//!   panic isolation, CORS, timeout, body limit, authentication)
//! - Bind server to listener and drain on shutdown
//! - Own the rate limiter sweeper for the lifetime of the server

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, Request},
    middleware, Router,
};
use tokio::net::TcpListener;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::auth::TokenValidator;
use crate::config::{AppConfig, CorsConfig};
use crate::data::Models;
use crate::handlers;
use crate::http::middleware::{
    authenticate, handle_panic, handle_request_timeout, log_internal_faults, track_metrics,
};
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::shutdown::{wait as shutdown_requested, Shutdown};
use crate::security::{rate_limit_middleware, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub models: Models,
}

/// HTTP server for the catalog API.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
    models: Models,
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Create a server backed by a fresh in-memory store.
    pub fn new(config: AppConfig) -> Self {
        let models = Models::in_memory(config.storage.query_timeout());
        Self::with_models(config, models)
    }

    /// Create a server over an existing storage facade.
    pub fn with_models(config: AppConfig, models: Models) -> Self {
        let config = Arc::new(config);
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        let state = AppState {
            config: Arc::clone(&config),
            models: models.clone(),
        };

        let router = Self::build_router(&config, state, Arc::clone(&limiter));
        Self {
            router,
            config,
            models,
            limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &AppConfig, state: AppState, limiter: Arc<RateLimiter>) -> Router {
        let validator = TokenValidator::new(state.models.clone());

        let mut app = handlers::api_routes()
            .layer(middleware::from_fn_with_state(validator, authenticate))
            .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(handle_request_timeout))
                    .layer(TimeoutLayer::new(config.server.request_timeout())),
            );

        if let Some(cors) = cors_layer(&config.cors) {
            app = app.layer(cors);
        }

        app.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                .layer(middleware::from_fn(track_metrics))
                .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
                .layer(middleware::from_fn(log_internal_faults))
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
    }

    /// A clone of the fully layered router, for driving without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn models(&self) -> &Models {
        &self.models
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = %self.config.server.environment,
            "HTTP server starting"
        );

        let sweeper = self
            .limiter
            .enabled()
            .then(|| self.limiter.spawn_sweeper(shutdown.subscribe()));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_requested(shutdown.subscribe()))
            .await?;

        // The sweeper may have been started after a trigger it never saw.
        shutdown.trigger();
        if let Some(sweeper) = sweeper {
            if let Err(e) = sweeper.await {
                tracing::warn!(error = %e, "Rate limit sweeper ended abnormally");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// CORS for trusted origins only; `None` when no origin is trusted.
fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .trusted_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::OPTIONS, Method::PUT, Method::PATCH, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.rate_limit.enabled = false;
        config
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_cors_disabled_without_origins() {
        assert!(cors_layer(&CorsConfig::default()).is_none());
        assert!(cors_layer(&CorsConfig {
            trusted_origins: vec!["https://example.com".into()],
        })
        .is_some());
    }

    #[tokio::test]
    async fn test_healthcheck_without_socket() {
        let server = HttpServer::new(test_config());
        let (status, body) = send(server.router(), get("/v1/healthcheck")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "available");
    }

    #[tokio::test]
    async fn test_clients_without_peer_address_share_a_bucket() {
        let mut config = test_config();
        config.rate_limit.enabled = true;
        config.rate_limit.burst_size = 2;
        config.rate_limit.requests_per_second = 0.001;
        let server = HttpServer::new(config);

        for _ in 0..2 {
            let (status, _) = send(server.router(), get("/v1/healthcheck")).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, body) = send(server.router(), get("/v1/healthcheck")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "rate limit exceeded");
        assert_eq!(server.limiter().tracked_clients(), 1);
    }

    #[tokio::test]
    async fn test_oversized_body_is_a_client_error() {
        let mut config = test_config();
        config.server.max_body_bytes = 64;
        let server = HttpServer::new(config);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(format!(r#"{{"name": "{}"}}"#, "x".repeat(256))))
            .unwrap();
        let (status, body) = send(server.router(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "body is larger than the allowed maximum");
    }

    #[tokio::test]
    async fn test_guard_runs_before_handler() {
        let server = HttpServer::new(test_config());
        let movie = crate::data::Movie::new(
            "Vertigo",
            1958,
            crate::data::Runtime(128),
            vec!["thriller".into()],
        );
        let movie = server.models().insert_movie(movie).await.unwrap();

        let request = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/v1/movies/{}", movie.id))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(server.router(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(server.models().get_movie(movie.id).await.is_ok());
    }
}
