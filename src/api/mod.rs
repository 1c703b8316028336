//! REST API for the driving monitor hub
//!
//! Read access to the durable store and the device registry, plus the one
//! write path back to devices (threshold commands).
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Shared state** holding the store, the registry and the command publisher
//! - Handlers call the core contracts directly; no business logic lives here
//!
//! ## Endpoints
//!
//! - `GET  /api/v1/health` - Store health
//! - `GET  /api/v1/devices` - Known devices
//! - `GET  /api/v1/devices/{id}/status` - Full state of one device
//! - `POST /api/v1/devices/{id}/threshold` - Send a threshold command
//! - `GET  /api/v1/alerts` - Alerts, newest first
//! - `GET  /api/v1/alerts/summary` - Alert counts per kind and event
//! - `GET  /api/v1/alerts/history` - Hourly alert counts
//! - `GET  /api/v1/readings/latest` - Newest readings in chronological order
//! - `GET  /api/v1/readings/batches` - Batch summaries, newest first
//! - `GET  /api/v1/readings/batches/{batch_id}` - Readings of one batch
//! - `GET  /api/v1/stats` - Aggregate counts and ingest counters
//! - `POST /api/v1/stats/reset` - Delete alerts

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ApiSettings;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:3001")
    pub bind_addr: SocketAddr,

    /// Enable permissive CORS for browser dashboards
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiSettings::default().into()
    }
}

impl From<ApiSettings> for ApiConfig {
    fn from(settings: ApiSettings) -> Self {
        Self {
            bind_addr: settings.bind_addr,
            enable_cors: settings.enable_cors,
        }
    }
}

/// Build the router with all routes
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/devices", get(routes::devices::list_devices))
        .route(
            "/api/v1/devices/:id/status",
            get(routes::devices::get_device_status),
        )
        .route(
            "/api/v1/devices/:id/threshold",
            post(routes::devices::set_threshold),
        )
        .route("/api/v1/alerts", get(routes::alerts::list_alerts))
        .route("/api/v1/alerts/summary", get(routes::alerts::alert_summary))
        .route("/api/v1/alerts/history", get(routes::alerts::alert_history))
        .route(
            "/api/v1/readings/latest",
            get(routes::readings::latest_readings),
        )
        .route(
            "/api/v1/readings/batches",
            get(routes::readings::list_batches),
        )
        .route(
            "/api/v1/readings/batches/:batch_id",
            get(routes::readings::batch_readings),
        )
        .route("/api/v1/stats", get(routes::stats::get_stats))
        .route("/api/v1/stats/reset", post(routes::stats::reset_stats))
        .with_state(state)
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let mut app = router(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
