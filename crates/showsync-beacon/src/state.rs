//! Shared application state for the beacon.
//!
//! [`AppState`] is the single context object the daemon wires everything
//! through: the current playback snapshot, the broadcast hub, and the
//! telemetry log. It is injected as `Arc<AppState>` into the Axum router
//! and handed to the poller, so the whole system can be instantiated
//! multiple times (tests run several beacons side by side) with no
//! ambient globals.

use showsync_types::PlaybackSnapshot;
use tokio::sync::RwLock;

use crate::hub::BroadcastHub;
use crate::telemetry::SyncLog;

/// Shared state for the Axum application and the poller.
///
/// The poller is the only writer of the snapshot; sessions and the HTTP
/// surface read it.
#[derive(Debug)]
pub struct AppState {
    /// The current snapshot. `None` until the first successful poll.
    snapshot: RwLock<Option<PlaybackSnapshot>>,
    /// Registry of live listener sessions.
    hub: BroadcastHub,
    /// Client sync-report log.
    sync_log: SyncLog,
}

impl AppState {
    /// Create state with no snapshot and an empty registry.
    pub fn new(sync_log: SyncLog) -> Self {
        Self {
            snapshot: RwLock::new(None),
            hub: BroadcastHub::new(),
            sync_log,
        }
    }

    /// The live session registry.
    pub const fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// The client telemetry log.
    pub const fn sync_log(&self) -> &SyncLog {
        &self.sync_log
    }

    /// Clone of the current snapshot, if any poll has succeeded yet.
    pub async fn current_snapshot(&self) -> Option<PlaybackSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Apply one poll cycle's outcome and fan the result out.
    ///
    /// A fresh snapshot replaces the current one wholesale. `None` marks a
    /// failed fetch: the previous snapshot's body is kept and only its
    /// timestamp advances, so listeners keep extrapolating against a live
    /// clock instead of a stale one. Nothing is broadcast until the first
    /// successful poll.
    pub async fn apply_poll(&self, fresh: Option<PlaybackSnapshot>, server_time_ms: u64) {
        let current = {
            let mut snapshot = self.snapshot.write().await;
            match fresh {
                Some(next) => *snapshot = Some(next),
                None => {
                    if let Some(existing) = snapshot.as_mut() {
                        existing.server_time_ms = server_time_ms;
                    }
                }
            }
            snapshot.clone()
        };

        if let Some(snapshot) = current {
            self.hub.broadcast(&snapshot).await;
        }
    }
}
