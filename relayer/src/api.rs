//! # HTTP Endpoints
//!
//! | Method | Path       | Description                          |
//! |--------|------------|--------------------------------------|
//! | GET    | `/health`  | Liveness probe                       |
//! | GET    | `/status`  | Heights, queue depths, minted supply |
//! | GET    | `/metrics` | Prometheus text exposition           |

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::metrics::{metrics_handler, SharedMetrics};
use crate::relay::{Relayer, RelayerStatus};

/// Relayer shared between the tick loop and request handlers.
pub type SharedRelayer = Arc<Mutex<Relayer>>;

/// State for the non-metrics handlers.
#[derive(Clone)]
pub struct AppState {
    /// Version string reported by `/status`.
    pub version: String,
    /// The live relayer.
    pub relayer: SharedRelayer,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    version: String,
    #[serde(flatten)]
    relayer: RelayerStatus,
}

/// Build the router for every endpoint.
pub fn create_router(state: AppState, metrics: SharedMetrics) -> Router {
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .with_state(state)
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let relayer = state.relayer.lock().status();
    Json(StatusResponse {
        version: state.version.clone(),
        relayer,
    })
}
