//! HTTP endpoint handlers for the aggregator.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/`: multiplexed query endpoint keyed by the `c` parameter
//! - `/health`: Health check endpoint
//! - `/metrics`: Prometheus metrics endpoint

pub mod health;
pub mod metrics;
pub mod query;
pub mod response;

use axum::{http::Method, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::state::SharedState;

// Re-export handlers
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use query::query_handler;

/// Builds the router. Peers are read from `ConnectInfo<SocketAddr>`, so the
/// server must be started with `into_make_service_with_connect_info`.
pub fn app_router(state: SharedState) -> Router {
    let mut app = Router::new().route("/", get(query_handler));

    if state.config.enable_health.unwrap_or(true) {
        app = app.route("/health", get(health_handler));
    }
    if state.config.enable_metrics.unwrap_or(true) {
        app = app.route("/metrics", get(metrics_handler));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);

    app.layer(cors).with_state(state)
}
