//! # SkillScore Server
//!
//! HTTP front end for the scoring pipeline.
//!
//! - `POST /api/skills` queues one scoring request per submitted skill and
//!   answers before any score exists
//! - `GET /api/skills?userID=..&skill=..` reads whatever the store holds
//! - `GET /ping` and `GET /health` report liveness and pipeline counters

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use handlers::health::{health_handler, ping_handler};

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(routes::PING, get(ping_handler))
        .route(routes::HEALTH, get(health_handler))
        .merge(routes::create_api_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
