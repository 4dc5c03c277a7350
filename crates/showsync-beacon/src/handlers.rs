//! HTTP endpoint handlers for the beacon's status surface.
//!
//! The `WebSocket` at `/ws` is the real product; these endpoints exist so
//! an operator can eyeball the beacon from a browser or curl without a
//! listener client.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/status` | Current snapshot + listener count as JSON |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::{Html, IntoResponse};

use crate::state::AppState;

/// Serve a minimal HTML page showing beacon status.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.current_snapshot().await;
    let clients = state.hub().client_count().await;

    let (play_state, track, position_ms) = snapshot.map_or_else(
        || (String::from("waiting for controller"), String::from("-"), 0),
        |s| {
            let track = if s.track_base.is_empty() {
                String::from("-")
            } else {
                s.track_base
            };
            (format!("{:?}", s.state).to_lowercase(), track, s.position_ms)
        },
    );

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>ShowSync Beacon</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 640px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; }}
    </style>
</head>
<body>
    <h1>ShowSync Beacon</h1>

    <div>
        <div class="metric">
            <div class="label">State</div>
            <div class="value">{play_state}</div>
        </div>
        <div class="metric">
            <div class="label">Track</div>
            <div class="value">{track}</div>
        </div>
        <div class="metric">
            <div class="label">Position</div>
            <div class="value">{position_ms} ms</div>
        </div>
        <div class="metric">
            <div class="label">Listeners</div>
            <div class="value">{clients}</div>
        </div>
    </div>

    <p>Listeners connect at <code>/ws</code>; JSON at <a href="/api/status">/api/status</a>.</p>
</body>
</html>"#
    ))
}

/// `GET /api/status` -- the current snapshot plus listener count.
///
/// `snapshot` is `null` until the first successful poll.
pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.current_snapshot().await;
    let clients = state.hub().client_count().await;

    Json(serde_json::json!({
        "snapshot": snapshot,
        "clients": clients,
    }))
}
