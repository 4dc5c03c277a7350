//! Tagged control messages exchanged over the listener `WebSocket`.
//!
//! Clients drive the clock-sync protocol: a `ping` is echoed back as a
//! `pong` carrying the server's wall clock, and `set_clock` asks the host
//! to step its system clock. Anything that fails to parse as a
//! [`ClientMessage`] is ignored by the session handler, which is what makes
//! unknown message types forward-compatible rather than fatal.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::report::SyncReport;

/// Messages a listener client may send to the beacon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Clock-sync probe. The client measures round-trip time against the
    /// echoed pair and derives its one-way clock offset externally.
    Ping {
        /// Client wall clock (Unix milliseconds) at send time.
        #[serde(rename = "clientTs", default)]
        client_ts: u64,
    },
    /// Request that the host system clock be stepped to the client's time.
    SetClock {
        /// Client wall clock (Unix milliseconds) to apply.
        #[serde(rename = "clientMs", default)]
        client_ms: u64,
    },
    /// Sync-quality telemetry, written through to the sync log.
    Report(SyncReport),
}

/// Replies the beacon sends to an individual client.
///
/// Broadcast snapshots are not part of this enum -- they are serialized as
/// bare [`crate::PlaybackSnapshot`] objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Echo of a [`ClientMessage::Ping`] with the server clock attached.
    Pong {
        /// The `client_ts` from the triggering ping, returned verbatim.
        #[serde(rename = "clientTs")]
        client_ts: u64,
        /// Server wall clock (Unix milliseconds) when the ping was handled.
        #[serde(rename = "serverTs")]
        server_ts: u64,
    },
    /// Outcome of a [`ClientMessage::SetClock`] request.
    ClockSet {
        /// Whether the host clock was actually stepped.
        success: bool,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn ping_parses_from_wire_form() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"ping","clientTs":1700000000123}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Ping {
                client_ts: 1_700_000_000_123
            }
        );
    }

    #[test]
    fn ping_defaults_missing_timestamp() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ping { client_ts: 0 });
    }

    #[test]
    fn report_fields_inline_with_tag() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"report","event":"TICK","fpp":1000,"target":1010,"local":990,"err":20,"avg2s":15,"rate":1.002,"eff":0.998,"offset":-3,"track":"MyShow"}"#,
        )
        .unwrap();
        let ClientMessage::Report(report) = msg else {
            panic!("expected a report");
        };
        assert_eq!(report.event, "TICK");
        assert_eq!(report.err, 20);
        assert_eq!(report.track, "MyShow");
    }

    #[test]
    fn unknown_type_is_a_parse_error() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn pong_serializes_wire_names() {
        let msg = ServerMessage::Pong {
            client_ts: 7,
            server_ts: 11,
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
        assert_eq!(json["type"], "pong");
        assert_eq!(json["clientTs"], 7);
        assert_eq!(json["serverTs"], 11);
    }

    #[test]
    fn clock_set_serializes_success_flag() {
        let msg = ServerMessage::ClockSet { success: false };
        let text = serde_json::to_string(&msg).unwrap();
        assert_eq!(text, r#"{"type":"clock_set","success":false}"#);
    }
}
