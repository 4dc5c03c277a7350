//! Normalization of raw controller status payloads.
//!
//! The controller's status API is treated as untrusted input: the poller
//! hands whatever JSON it fetched to [`normalize_status`], which either
//! produces a canonical [`PlaybackSnapshot`] or reports the payload as
//! unusable (`None`), which the poller treats identically to a failed
//! fetch.

use serde_json::Value;
use showsync_types::{PlaybackSnapshot, PlaybackState};

use crate::audio::AudioResolver;

/// Convert a raw upstream status payload into the broadcast snapshot.
///
/// Returns `None` when the payload is not a JSON object. Field extraction
/// is deliberately forgiving: the controller reports numbers as either
/// JSON numbers or numeric strings depending on firmware version, and
/// missing fields fall back to stopped/empty/zero.
pub fn normalize_status(
    raw: &Value,
    server_time_ms: u64,
    audio: &AudioResolver,
) -> Option<PlaybackSnapshot> {
    let obj = raw.as_object()?;

    let status_name = obj
        .get("status_name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();
    let status_code = obj.get("status").and_then(coerce_i64).unwrap_or(-1);
    let state = classify_state(&status_name, status_code);

    let sequence = obj
        .get("current_sequence")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let track_base = track_base(sequence);

    // `milliseconds_elapsed`, not the whole-second `seconds_played`
    // counter: listeners interpolate between broadcasts and need real
    // millisecond precision.
    let position_ms = obj
        .get("milliseconds_elapsed")
        .and_then(coerce_u64)
        .unwrap_or(0);

    let audio_url = audio.resolve(&track_base);

    Some(PlaybackSnapshot {
        state,
        track_base,
        position_ms,
        audio_url,
        server_time_ms,
    })
}

/// Classification policy: a recognized textual status wins, the numeric
/// code is the fallback, and anything else reads as stopped.
fn classify_state(status_name: &str, status_code: i64) -> PlaybackState {
    match status_name {
        "playing" | "play" => PlaybackState::Playing,
        "paused" | "pause" => PlaybackState::Paused,
        "idle" | "stopped" | "stop" => PlaybackState::Stopped,
        _ => match status_code {
            1 => PlaybackState::Playing,
            2 => PlaybackState::Paused,
            _ => PlaybackState::Stopped,
        },
    }
}

/// Strip directory and extension from a sequence path.
fn track_base(sequence: &str) -> String {
    std::path::Path::new(sequence)
        .file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or_default()
        .to_owned()
}

/// Read an integer that may arrive as a JSON number or a numeric string.
fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a non-negative integer that may arrive as a JSON number or a
/// numeric string.
fn coerce_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
