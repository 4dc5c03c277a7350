//! Sync-quality telemetry submitted by listener clients.
//!
//! A report is a snapshot of one client's playback-correction loop at a
//! single instant. Reports are transient: the beacon writes them to the
//! sync log and discards them. Clients only send reports when the operator
//! enables server-side logging, so every field is optional on the wire and
//! defaulted here.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One client's instantaneous sync-quality sample.
///
/// All position and error fields are milliseconds. Positive `err` means
/// the client's audio is behind the computed target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SyncReport {
    /// Event name (`TICK`, `TRACK`, `SEEK`, ...). `TRACK` marks a new
    /// song and resets the sync log.
    #[serde(default)]
    pub event: String,
    /// Raw position reported by the controller.
    #[serde(default)]
    pub fpp: i64,
    /// Computed target position after clock offset and elapsed time.
    #[serde(default)]
    pub target: i64,
    /// The client's local audio position.
    #[serde(default)]
    pub local: i64,
    /// Instantaneous error (`target - local`).
    #[serde(default)]
    pub err: i64,
    /// Two-second rolling average error, the correction loop's input.
    #[serde(default)]
    pub avg2s: i64,
    /// Current playback-rate setting.
    #[serde(default = "default_rate")]
    pub rate: f64,
    /// Measured effective rate (audio progression over wall time).
    #[serde(default)]
    pub eff: f64,
    /// Estimated clock offset between client and server.
    #[serde(default)]
    pub offset: i64,
    /// Track base name the report refers to.
    #[serde(default)]
    pub track: String,
}

/// Nominal playback rate assumed when a report omits it.
const fn default_rate() -> f64 {
    1.0
}
