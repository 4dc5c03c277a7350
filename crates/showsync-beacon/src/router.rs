//! Axum router construction for the beacon.
//!
//! Assembles the `WebSocket` endpoint and the small status surface into a
//! single [`Router`] with CORS middleware enabled, since the listener
//! client may be served from a different origin than the beacon.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the beacon.
///
/// Routes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws` -- listener `WebSocket` (snapshot stream + clock sync)
/// - `GET /api/status` -- current snapshot + listener count
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/ws", get(ws::ws_listen))
        .route("/api/status", get(handlers::get_status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
