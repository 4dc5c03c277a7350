//! Live session registry and snapshot fan-out.
//!
//! The hub owns the set of connected listener sessions. Fan-out is
//! message-passing: each session has a small bounded queue drained by its
//! own transport writer, and [`BroadcastHub::broadcast`] offers the frame
//! to every queue without blocking. A session whose queue is full or
//! closed is collected during the sweep and unregistered after it, so the
//! hub's latency to healthy clients is independent of how many stalled
//! ones exist.
//!
//! The registry is the single source of truth for delivery targets: a
//! session removed here receives no further pushes even while its socket
//! is still draining.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::ws::{Message, Utf8Bytes};
use chrono::{DateTime, Utc};
use showsync_types::PlaybackSnapshot;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

/// Frames queued to one client before it is considered stalled.
///
/// The queue only has to absorb jitter between the poll cadence and the
/// client's transport; a client a full queue behind is dropped in favor
/// of freshness for everyone else.
pub const SESSION_QUEUE_CAPACITY: usize = 8;

/// Unique identifier for one live client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Mint a fresh session id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One client's live connection as the hub sees it.
#[derive(Debug)]
pub struct ClientSession {
    /// Unique session id.
    pub id: SessionId,
    /// Peer address, used for logs and telemetry attribution.
    pub remote_addr: SocketAddr,
    /// When the connection was accepted.
    pub connected_at: DateTime<Utc>,
    /// Queue feeding this session's transport writer.
    outbound: mpsc::Sender<Message>,
}

impl ClientSession {
    /// Create a session around the writer queue for one connection.
    pub fn new(remote_addr: SocketAddr, outbound: mpsc::Sender<Message>) -> Self {
        Self {
            id: SessionId::new(),
            remote_addr,
            connected_at: Utc::now(),
            outbound,
        }
    }
}

/// Registry of live sessions plus the fan-out operation.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    sessions: RwLock<HashMap<SessionId, ClientSession>>,
}

impl BroadcastHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Add a session to the registry.
    pub async fn register(&self, session: ClientSession) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id, session);
    }

    /// Remove a session. Idempotent; unknown ids are a no-op.
    pub async fn unregister(&self, id: SessionId) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&id);
    }

    /// Number of currently registered sessions.
    pub async fn client_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Push a snapshot to every registered session.
    ///
    /// The frame is serialized once and offered to each session's queue
    /// without blocking, so no delivery is serialized behind another's
    /// transport. Sessions whose queue is full (stalled transport) or
    /// closed are collected during the sweep and unregistered after it
    /// completes, never mid-iteration.
    pub async fn broadcast(&self, snapshot: &PlaybackSnapshot) {
        let json = match serde_json::to_string(snapshot) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "snapshot serialization failed");
                return;
            }
        };
        let frame = Message::Text(Utf8Bytes::from(json));

        let mut dead = Vec::new();
        {
            let sessions = self.sessions.read().await;
            for (id, session) in sessions.iter() {
                if let Err(e) = session.outbound.try_send(frame.clone()) {
                    debug!(session = %id, addr = %session.remote_addr, error = %e, "dropping stalled session");
                    dead.push(*id);
                }
            }
        }

        if !dead.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in dead {
                sessions.remove(&id);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use showsync_types::PlaybackState;

    use super::*;

    fn sample_snapshot(position_ms: u64) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: PlaybackState::Playing,
            track_base: String::from("MyShow"),
            position_ms,
            audio_url: None,
            server_time_ms: position_ms,
        }
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:4000".parse().unwrap()
    }

    async fn register_session(hub: &BroadcastHub, capacity: usize) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(capacity);
        hub.register(ClientSession::new(peer(), tx)).await;
        rx
    }

    #[tokio::test]
    async fn broadcast_reaches_every_registered_session() {
        let hub = BroadcastHub::new();
        let mut first = register_session(&hub, 4).await;
        let mut second = register_session(&hub, 4).await;

        hub.broadcast(&sample_snapshot(10)).await;

        for rx in [&mut first, &mut second] {
            let frame = rx.recv().await.unwrap();
            let Message::Text(text) = frame else {
                panic!("expected a text frame");
            };
            let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            assert_eq!(json["trackBase"], "MyShow");
            assert_eq!(json["positionMs"], 10);
        }
    }

    #[tokio::test]
    async fn stalled_session_is_dropped_without_delaying_the_rest() {
        let hub = BroadcastHub::new();
        // Capacity 1 and never drained: stalls after one frame.
        let _stalled = register_session(&hub, 1).await;
        let mut healthy = register_session(&hub, 16).await;

        hub.broadcast(&sample_snapshot(1)).await;
        hub.broadcast(&sample_snapshot(2)).await;

        // The stalled session's queue was full on the second sweep.
        assert_eq!(hub.client_count().await, 1);

        // The healthy session saw both frames.
        assert!(healthy.recv().await.is_some());
        assert!(healthy.recv().await.is_some());
    }

    #[tokio::test]
    async fn closed_session_is_reaped_on_broadcast() {
        let hub = BroadcastHub::new();
        let rx = register_session(&hub, 4).await;
        drop(rx);

        assert_eq!(hub.client_count().await, 1);
        hub.broadcast(&sample_snapshot(5)).await;
        assert_eq!(hub.client_count().await, 0);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let hub = BroadcastHub::new();
        let (tx, _rx) = mpsc::channel(4);
        let session = ClientSession::new(peer(), tx);
        let id = session.id;
        hub.register(session).await;

        hub.unregister(id).await;
        hub.unregister(id).await;
        assert_eq!(hub.client_count().await, 0);
    }
}
