//! Main application state and HTTP dispatch surface
//!
//! This module wires configuration, collaborator sources, production
//! clients, adapters, and the dispatcher into the running service, and
//! exposes the two-call allocation protocol over HTTP.

use crate::allocator::gamelift::GameLiftClientFactory;
use crate::allocator::{
    AgonesAllocator, AllocatorRegistry, Dispatcher, GameLiftAllocator, MultiplayAllocator,
    PlayFabAllocator,
};
use crate::client::{
    HttpAgonesApi, HttpMultiplayApiFactory, HttpPlayFabAuthApi, HttpPlayFabClientFactory,
};
use crate::config::AppConfig;
use crate::metrics::MetricsCollector;
use crate::remote_config::EnvConfigSource;
use crate::secrets::{EnvSecretSource, SecretSource};
use crate::service::health::{HealthCheck, HealthStatus};
use crate::types::{
    AllocateRequest, AllocateResponse, BackendKind, PollRequest, PollResponse,
};
use crate::utils::generate_correlation_id;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Build the default adapter registry from configuration
///
/// Registers every backend with a shipped production client. GameLift is
/// registered only when the host supplies a client factory wrapping its AWS
/// SDK; without one, hosts that dispatch to GameLift build their registry
/// through [`AppState::with_registry`].
pub fn default_registry(
    config: &AppConfig,
    gamelift_factory: Option<Arc<dyn GameLiftClientFactory>>,
) -> AllocatorRegistry {
    let secrets: Arc<dyn SecretSource> = Arc::new(EnvSecretSource::new());

    let mut registry = AllocatorRegistry::new();

    registry.register(
        BackendKind::Agones,
        Arc::new(AgonesAllocator::new(Arc::new(HttpAgonesApi::new(
            &config.agones,
        )))),
    );

    registry.register(
        BackendKind::Multiplay,
        Arc::new(MultiplayAllocator::new(
            Arc::new(HttpMultiplayApiFactory::new(&config.multiplay)),
            config.multiplay.clone(),
        )),
    );

    registry.register(
        BackendKind::PlayFab,
        Arc::new(PlayFabAllocator::new(
            secrets.clone(),
            Arc::new(HttpPlayFabAuthApi::new()),
            Arc::new(HttpPlayFabClientFactory::new()),
            config.playfab.clone(),
        )),
    );

    if let Some(factory) = gamelift_factory {
        registry.register(
            BackendKind::GameLift,
            Arc::new(GameLiftAllocator::new(
                secrets,
                Arc::new(EnvConfigSource::new()),
                factory,
                config.gamelift.clone(),
            )),
        );
    }

    registry
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Canonical-call dispatcher over the registered adapters
    dispatcher: Dispatcher,

    /// Prometheus metrics
    metrics: MetricsCollector,

    /// Service start time for uptime reporting
    started_at: Instant,

    /// Shutdown signal for the HTTP server
    shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Create application state with the default adapter registry
    pub fn new(config: AppConfig) -> Result<Self> {
        let registry = default_registry(&config, None);
        Self::with_registry(config, registry)
    }

    /// Create application state with a caller-assembled registry
    pub fn with_registry(config: AppConfig, registry: AllocatorRegistry) -> Result<Self> {
        let backend = config.allocator.backend_kind()?;
        let metrics = MetricsCollector::new()?;
        let (shutdown_tx, _) = broadcast::channel(1);

        info!(
            "Initialized allocator dispatch - backend: {}, registered: {:?}",
            backend,
            registry
                .registered()
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            config,
            dispatcher: Dispatcher::new(backend, registry),
            metrics,
            started_at: Instant::now(),
            shutdown_tx,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Time since the service started
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Handle an allocation submission
    pub async fn allocate(&self, request: AllocateRequest) -> AllocateResponse {
        let ctx = self.config.context.call_context();
        let backend = self.dispatcher.backend();
        let start = Instant::now();

        let response = self.dispatcher.allocate(&ctx, request).await;
        self.metrics
            .record_allocation(backend, response.status, start.elapsed());

        response
    }

    /// Handle a poll attempt
    pub async fn poll(&self, request: PollRequest) -> PollResponse {
        let ctx = self.config.context.call_context();
        let backend = request.allocation_data.backend();
        let start = Instant::now();

        let response = self.dispatcher.poll(&ctx, request).await;
        self.metrics
            .record_poll(backend, response.status, start.elapsed());

        response
    }

    /// Start the HTTP server, serving until a shutdown signal arrives
    pub async fn start(self: Arc<Self>) -> Result<()> {
        let addr: SocketAddr = format!(
            "{}:{}",
            self.config.service.host, self.config.service.http_port
        )
        .parse()
        .context("Invalid HTTP server address")?;

        let app = create_router(self.clone());
        let listener = TcpListener::bind(addr).await?;

        info!("Allocation API listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("HTTP server shutdown signal received");
            })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Signal the HTTP server to stop
    pub fn stop(&self) {
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to HTTP server: {}", e);
        }
    }
}

/// Create the Axum router with all service endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/v1/allocate", post(allocate_handler))
        .route("/v1/poll", post(poll_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Root endpoint handler - shows service information
async fn root_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "service": state.config().service.name,
        "version": crate::VERSION,
        "backend": state.dispatcher().backend().to_string(),
        "endpoints": [
            "/v1/allocate",
            "/v1/poll",
            "/health",
            "/metrics"
        ]
    }))
}

/// Allocation submission endpoint
///
/// Always responds 200 with a well-formed canonical response; failures are
/// carried in-band as `status = Error`.
async fn allocate_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AllocateRequest>,
) -> Json<AllocateResponse> {
    debug!(
        "Allocate requested - match: '{}', correlation: {}",
        request.match_id,
        generate_correlation_id()
    );
    Json(state.allocate(request).await)
}

/// Poll endpoint, same in-band error contract as allocate
async fn poll_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PollRequest>,
) -> Json<PollResponse> {
    debug!(
        "Poll requested - match: '{}', correlation: {}",
        request.match_id,
        generate_correlation_id()
    );
    Json(state.poll(request).await)
}

/// Health check endpoint handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match HealthCheck::check(state).await {
        Ok(health) => {
            let code = match health.status {
                HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
                HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
            };
            (code, Json(serde_json::to_value(health).unwrap_or_default()))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "unhealthy", "error": e.to_string() })),
        ),
    }
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics().render() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}
