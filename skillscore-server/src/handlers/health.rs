use axum::{extract::State, response::Json};
use serde_json::{Value, json};
use tracing::debug;

use crate::AppState;

pub async fn ping_handler() -> Json<Value> {
    debug!("Ping endpoint called");
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Liveness plus the dispatcher and store counters.
///
/// `dispatch.completed` counts scored-and-stored requests for the worker
/// strategy and handed-to-broker messages for the broker strategy.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let dispatch = state.dispatcher.stats();
    let store = state.store.stats();

    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "dispatch": {
            "strategy": state.dispatcher.strategy(),
            "enqueued": dispatch.enqueued,
            "completed": dispatch.completed,
            "failed": dispatch.failed,
        },
        "store": store,
    }))
}
