//! The canonical playback snapshot broadcast to listeners.
//!
//! Exactly one snapshot is current at any instant. The poller replaces it
//! wholesale after every successful upstream read; on a failed read only
//! `server_time_ms` is refreshed so listeners never extrapolate elapsed
//! time from a stale timestamp.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Coarse playback state reported by the show controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// A sequence is actively playing.
    Playing,
    /// Playback is paused mid-sequence.
    Paused,
    /// Nothing is playing.
    Stopped,
}

/// The single current playback-state record broadcast to clients.
///
/// Serialized as a bare JSON object (no `type` tag) -- the broadcast stream
/// carries nothing but snapshots, so the shape itself is the discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    /// Current playback state.
    pub state: PlaybackState,
    /// Sequence filename stripped of directory and extension. Empty when
    /// nothing is loaded.
    pub track_base: String,
    /// Playback position in milliseconds, from the controller's
    /// sub-second-precision elapsed counter.
    pub position_ms: u64,
    /// Public URL of the matching audio asset, omitted when none exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    /// Server wall clock (Unix milliseconds) at the instant `position_ms`
    /// was valid. Listeners use this for elapsed-time extrapolation and
    /// clock-offset correction.
    pub server_time_ms: u64,
}
