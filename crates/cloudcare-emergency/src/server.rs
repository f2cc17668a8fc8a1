use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::get,
};
use cloudcare_core::events::EmergencyBroadcaster;
use cloudcare_storage::{DynEmergencyStorage, create_memory_storage};
use tokio_util::sync::CancellationToken;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    alerts::AlertService, bootstrap, config::AppConfig, config::CorsConfig, handlers,
    middleware as app_middleware, routes,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: DynEmergencyStorage,
    pub broadcaster: EmergencyBroadcaster,
    pub alerts: Arc<AlertService>,
    /// Cancelled when the server begins shutting down; open streams watch it.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire storage, broadcaster and alert service from configuration and
    /// seed the directory.
    pub async fn from_config(cfg: &AppConfig, shutdown: CancellationToken) -> anyhow::Result<Self> {
        let storage = create_memory_storage();
        bootstrap::seed_directory(&storage, &cfg.bootstrap).await?;

        let broadcaster = EmergencyBroadcaster::with_options(cfg.broadcaster_options());
        tracing::info!(
            keepalive_secs = cfg.emergency.keepalive_secs,
            delivery = %cfg.emergency.delivery,
            "Emergency broadcaster initialized"
        );

        let alerts = Arc::new(AlertService::new(storage.clone(), broadcaster.clone()));
        Ok(Self {
            config: Arc::new(cfg.clone()),
            storage,
            broadcaster,
            alerts,
            shutdown,
        })
    }
}

pub struct EmergencyServer {
    addr: SocketAddr,
    app: Router,
    shutdown: CancellationToken,
}

pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let state = AppState::from_config(cfg, CancellationToken::new()).await?;
    Ok(build_router(state))
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    let cors = cors_layer(&state.config.cors);
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .merge(routes::emergency_routes())
        // Later layers wrap earlier ones: body limit -> request id -> trace ->
        // compression -> cors -> content negotiation -> routes
        .layer(middleware::from_fn(app_middleware::content_negotiation))
        .layer(cors)
        // Default predicate skips text/event-stream, so the alert stream is never buffered
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .headers()
                        .get(app_middleware::REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        // Outside the trace layer so the span reads a generated id too
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Browser dashboards call the API with credentials, so a concrete origin
/// list mirrors methods and headers instead of using wildcards.
fn cors_layer(cfg: &CorsConfig) -> CorsLayer {
    if cfg.allows_any() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = cfg
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<EmergencyServer> {
        let shutdown = CancellationToken::new();
        let state = AppState::from_config(&self.config, shutdown.clone()).await?;

        Ok(EmergencyServer {
            addr: self.addr,
            app: build_router(state),
            shutdown,
        })
    }
}

impl EmergencyServer {
    /// Token cancelled when the server shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal(self.shutdown))
            .await?;
        Ok(())
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    // Wait for Ctrl+C or an explicit cancel
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
        _ = shutdown.cancelled() => {}
    }
    // Ends open alert streams so the graceful shutdown can drain
    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    #[tokio::test]
    async fn cors_allows_configured_origin_with_credentials() {
        let app = build_app(&AppConfig::default()).await.unwrap();
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn cors_rejects_unknown_origin() {
        let app = build_app(&AppConfig::default()).await.unwrap();
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .header(header::ORIGIN, "http://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn request_id_is_generated() {
        let app = build_app(&AppConfig::default()).await.unwrap();
        let resp = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(resp.headers().contains_key(app_middleware::REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn readyz_reports_shutdown() {
        let shutdown = CancellationToken::new();
        let state = AppState::from_config(&AppConfig::default(), shutdown.clone())
            .await
            .unwrap();
        let app = build_router(state);
        shutdown.cancel();

        let resp = app
            .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "service_unavailable");
        assert_eq!(body["detail"], "server is shutting down");
    }
}
