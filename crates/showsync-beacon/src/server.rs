//! Beacon HTTP server lifecycle management.
//!
//! Provides [`start_server`] which binds the listen address and runs the
//! Axum server for the rest of the process lifetime. A failed bind is a
//! startup failure the daemon propagates fatally; nothing after a
//! successful bind terminates the server short of process shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::ListenConfig;
use crate::router::build_router;
use crate::state::AppState;

/// Errors that can occur when starting or running the beacon server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

/// Start the beacon server.
///
/// Binds to the configured address, builds the router, and serves until
/// the process is terminated. Connections are served with per-peer
/// address info so sessions can attribute telemetry to a client.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] when the address is invalid or the TCP
/// listener cannot bind, and [`ServerError::Serve`] on a fatal I/O error
/// while serving.
pub async fn start_server(config: &ListenConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "beacon listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    Ok(())
}
