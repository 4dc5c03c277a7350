//! Per-connection `WebSocket` session handling.
//!
//! A session moves `connecting -> active -> closed`. The upgrade is the
//! connecting phase; registering with the hub makes it active; and every
//! exit path funnels through a single unregister, so `closed` is
//! reachable from any point, including mid-message handling.
//!
//! While active, one `select!` loop multiplexes three sources: broadcast
//! frames from the hub queue, inbound client frames, and a transport
//! keepalive timer. Unparseable or oversized inbound frames are ignored
//! rather than treated as protocol errors -- the connection stays open.

use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use showsync_types::{ClientMessage, PlaybackSnapshot, ServerMessage};
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};

use crate::clock::{now_unix_ms, set_system_clock};
use crate::hub::{ClientSession, SESSION_QUEUE_CAPACITY};
use crate::state::AppState;

/// Cadence of transport-level keepalive pings. Separate from the
/// client-driven clock-sync pings, which ride the text protocol.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(20);

/// Idle window after which a silent client is forcibly closed: one
/// keepalive round plus the pong tolerance.
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(50);

/// Largest inbound text frame that will be parsed. Control messages are
/// tiny JSON; anything bigger is ignored.
const MAX_FRAME_BYTES: usize = 4096;

/// Upgrade `GET /ws` into a listener session.
pub async fn ws_listen(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session(socket, addr, state))
}

/// Drive one client session from accept to close.
async fn handle_session(mut socket: WebSocket, addr: SocketAddr, state: Arc<AppState>) {
    let (outbound, mut frames) = mpsc::channel(SESSION_QUEUE_CAPACITY);
    let session = ClientSession::new(addr, outbound);
    let id = session.id;
    state.hub().register(session).await;
    let client_count = state.hub().client_count().await;
    info!(
        session = %id,
        %addr,
        clients = client_count,
        "listener connected"
    );

    // Deliver the current snapshot directly so the client does not wait
    // out a poll cycle for its first state. Registration already
    // happened, so a broadcast racing this delivery lands in the queue
    // and follows it onto the wire. Before the first successful poll
    // there is nothing to send.
    let mut alive = true;
    if let Some(snapshot) = state.current_snapshot().await {
        if send_snapshot(&mut socket, &snapshot).await.is_err() {
            debug!(session = %id, "client lost before first delivery");
            alive = false;
        }
    }

    let mut keepalive = interval_at(Instant::now() + KEEPALIVE_INTERVAL, KEEPALIVE_INTERVAL);
    let mut last_seen = Instant::now();

    while alive {
        tokio::select! {
            frame = frames.recv() => {
                match frame {
                    Some(frame) => {
                        if socket.send(frame).await.is_err() {
                            debug!(session = %id, "send failed, closing");
                            break;
                        }
                    }
                    // The hub reaped this session as stalled.
                    None => break,
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(message)) => {
                        last_seen = Instant::now();
                        if handle_message(&mut socket, &state, addr, message).await.is_break() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(session = %id, error = %e, "transport error");
                        break;
                    }
                    None => break,
                }
            }
            _ = keepalive.tick() => {
                if last_seen.elapsed() > KEEPALIVE_TIMEOUT {
                    debug!(session = %id, "keepalive timeout, closing");
                    break;
                }
                if socket.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.hub().unregister(id).await;
    let client_count = state.hub().client_count().await;
    info!(
        session = %id,
        %addr,
        clients = client_count,
        "listener disconnected"
    );
}

/// React to one inbound frame. `Break` closes the session.
async fn handle_message(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    addr: SocketAddr,
    message: Message,
) -> ControlFlow<()> {
    match message {
        Message::Text(text) => handle_text(socket, state, addr, text.as_str()).await,
        Message::Ping(payload) => {
            if socket.send(Message::Pong(payload)).await.is_err() {
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        }
        Message::Close(_) => ControlFlow::Break(()),
        // Pong and binary frames carry nothing actionable.
        Message::Pong(_) | Message::Binary(_) => ControlFlow::Continue(()),
    }
}

/// Dispatch one text frame. Oversized or unparseable frames are dropped
/// without closing the connection.
async fn handle_text(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    addr: SocketAddr,
    text: &str,
) -> ControlFlow<()> {
    if text.len() > MAX_FRAME_BYTES {
        debug!(%addr, bytes = text.len(), "oversized frame ignored");
        return ControlFlow::Continue(());
    }

    let Ok(message) = serde_json::from_str::<ClientMessage>(text) else {
        debug!(%addr, "unparseable frame ignored");
        return ControlFlow::Continue(());
    };

    match message {
        ClientMessage::Ping { client_ts } => {
            let pong = ServerMessage::Pong {
                client_ts,
                server_ts: now_unix_ms(),
            };
            send_message(socket, &pong).await
        }
        ClientMessage::SetClock { client_ms } => {
            let success = match set_system_clock(client_ms).await {
                Ok(()) => {
                    info!(%addr, client_ms, "host clock stepped from client");
                    true
                }
                Err(e) => {
                    warn!(%addr, error = %e, "clock set request failed");
                    false
                }
            };
            send_message(socket, &ServerMessage::ClockSet { success }).await
        }
        ClientMessage::Report(report) => {
            state
                .sync_log()
                .log_report(&addr.ip().to_string(), &report);
            ControlFlow::Continue(())
        }
    }
}

/// Serialize and send a reply; only a transport failure closes the
/// session.
async fn send_message(socket: &mut WebSocket, message: &ServerMessage) -> ControlFlow<()> {
    let Ok(json) = serde_json::to_string(message) else {
        return ControlFlow::Continue(());
    };
    if socket
        .send(Message::Text(Utf8Bytes::from(json)))
        .await
        .is_err()
    {
        return ControlFlow::Break(());
    }
    ControlFlow::Continue(())
}

/// Send a bare snapshot frame (initial delivery on connect).
async fn send_snapshot(
    socket: &mut WebSocket,
    snapshot: &PlaybackSnapshot,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(snapshot).map_err(axum::Error::new)?;
    socket.send(Message::Text(Utf8Bytes::from(json))).await
}
