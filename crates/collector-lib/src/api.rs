//! HTTP API: simulated-work status, liveness and Prometheus metrics

use crate::{
    models::{HealthResponse, StatusResponse},
    observability::CollectorMetrics,
};
use anyhow::Context;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

/// Source of the artificial latency applied by the status route
pub trait WorkDelay: Send + Sync {
    fn next_delay(&self) -> Duration;
}

/// Delay in `[min, max)` chosen from the current clock
///
/// Not reproducible and not meant to be; it only simulates uneven load.
#[derive(Debug, Clone)]
pub struct TimeSeededDelay {
    min: Duration,
    max: Duration,
}

impl TimeSeededDelay {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }
}

impl Default for TimeSeededDelay {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_millis(500))
    }
}

impl WorkDelay for TimeSeededDelay {
    fn next_delay(&self) -> Duration {
        let span_ms = self.max.saturating_sub(self.min).as_millis() as u64;
        if span_ms == 0 {
            return self.min;
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;

        self.min + Duration::from_millis(now % span_ms)
    }
}

/// Constant delay, for deterministic callers
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl WorkDelay for FixedDelay {
    fn next_delay(&self) -> Duration {
        self.0
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub metrics: CollectorMetrics,
    pub work: Arc<dyn WorkDelay>,
}

impl AppState {
    pub fn new(metrics: CollectorMetrics, work: Arc<dyn WorkDelay>) -> Self {
        Self { metrics, work }
    }
}

/// Simulated work: counts the request, sleeps, records the latency
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let start = Instant::now();
    state.metrics.inc_requests();

    tokio::time::sleep(state.work.next_delay()).await;
    let body = Json(StatusResponse::ok());

    state
        .metrics
        .observe_request_duration(start.elapsed().as_secs_f64());

    body
}

/// Liveness check - always healthy while the process serves requests
async fn health() -> impl IntoResponse {
    Json(HealthResponse::healthy_now())
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, state.metrics.content_type())],
            text,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";

/// Permissive CORS; OPTIONS requests are answered here with an empty 200
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Create the API router
///
/// Every route answers any method. Paths without a route of their own are
/// served by the status handler. The allow-methods and allow-headers CORS
/// headers go on every response, not only on preflight.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", any(status))
        .route("/health", any(health))
        .route("/metrics", any(metrics))
        .fallback(status)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
        .layer(cors_layer())
        .with_state(state)
}

/// Bind the listening socket
pub async fn bind(addr: &str) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))
}

/// Serve the API until `shutdown` resolves, then drain in-flight requests
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let addr = listener.local_addr()?;
    info!(addr = %addr, "Starting API server");
    info!(
        url = %format!("http://localhost:{}/metrics", addr.port()),
        "Metrics available"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
