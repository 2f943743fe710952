//! beacon-api — HTTP surface for Beacon.
//!
//! Serves the aggregator's published status. Handlers only read; nothing
//! here triggers a tick.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | HEAD | `/` | Heartbeat probe, status in headers |
//! | HEAD | `/v2/heartbeat` | Same as `/` |
//! | GET | `/v2/status` | Extended status as JSON |
//! | GET | `/metrics` | Prometheus exposition |
//!
//! Routes that accept work can be wrapped with [`require_healthy`] to
//! refuse requests while the service is MAJOR.

pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, head};
use beacon_health::HealthAggregator;

pub use error::ApiError;
pub use middleware::require_healthy;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub health: Arc<HealthAggregator>,
}

/// Build the status router.
pub fn build_router(health: Arc<HealthAggregator>) -> Router {
    let state = ApiState { health };

    Router::new()
        .route("/", head(handlers::heartbeat))
        .route("/v2/heartbeat", head(handlers::heartbeat))
        .route("/v2/status", get(handlers::status))
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
}
