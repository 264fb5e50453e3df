//! Questline push provider: the server side of the reward pipeline.
//!
//! Exposes one WebSocket endpoint per user for real-time envelopes, an XP
//! grant route that feeds it, and a stats route for the dashboard.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ServerConfig;
pub use state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/ws", get(ws::ws_handler))
        .route("/api/rewards", post(routes::rewards::grant_reward))
        .route("/api/users/{user_id}/stats", get(routes::stats::get_user_stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
