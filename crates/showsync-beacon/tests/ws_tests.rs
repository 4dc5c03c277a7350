//! End-to-end `WebSocket` tests against a live beacon.
//!
//! Each test binds an ephemeral port, serves the real router with
//! connect-info (sessions need peer addresses), and drives it with a
//! `tokio-tungstenite` client exactly as a listener would.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use showsync_beacon::build_router;
use showsync_beacon::state::AppState;
use showsync_beacon::telemetry::SyncLog;
use showsync_types::{PlaybackSnapshot, PlaybackState};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Bind a beacon on an ephemeral port and serve it in the background.
async fn spawn_beacon() -> (Arc<AppState>, SocketAddr, PathBuf) {
    let log_path = std::env::temp_dir()
        .join(format!("showsync-ws-{}", uuid::Uuid::now_v7()))
        .join("sync.log");
    let state = Arc::new(AppState::new(
        SyncLog::new(log_path.clone(), 5 * 1024 * 1024).unwrap(),
    ));

    let router = build_router(Arc::clone(&state));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (state, addr, log_path)
}

async fn connect(addr: SocketAddr) -> WsStream {
    let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    ws
}

/// Read frames until the next text frame, parsed as JSON.
async fn next_json(ws: &mut WsStream) -> serde_json::Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

fn sample_snapshot(server_time_ms: u64) -> PlaybackSnapshot {
    PlaybackSnapshot {
        state: PlaybackState::Playing,
        track_base: String::from("MyShow"),
        position_ms: 12_345,
        audio_url: Some(String::from("/music/MyShow.mp3")),
        server_time_ms,
    }
}

#[tokio::test]
async fn client_connecting_before_any_poll_waits_for_the_first_broadcast() {
    let (state, addr, _log) = spawn_beacon().await;
    let mut ws = connect(addr).await;

    // No successful poll yet: the beacon stays silent.
    let silence = tokio::time::timeout(Duration::from_millis(300), ws.next()).await;
    assert!(silence.is_err(), "expected no frame before the first poll");

    // The first successful poll reaches the already-connected client.
    state.apply_poll(Some(sample_snapshot(1_000)), 1_000).await;
    let json = next_json(&mut ws).await;
    assert_eq!(json["trackBase"], "MyShow");
    assert_eq!(json["serverTimeMs"], 1_000);
}

#[tokio::test]
async fn client_connecting_after_a_poll_gets_the_snapshot_immediately() {
    let (state, addr, _log) = spawn_beacon().await;
    state.apply_poll(Some(sample_snapshot(1_000)), 1_000).await;

    let mut ws = connect(addr).await;
    let json = next_json(&mut ws).await;
    assert_eq!(json["state"], "playing");
    assert_eq!(json["trackBase"], "MyShow");
    assert_eq!(json["positionMs"], 12_345);
    assert_eq!(json["audioUrl"], "/music/MyShow.mp3");
}

#[tokio::test]
async fn ping_is_echoed_with_a_non_decreasing_server_clock() {
    let (_state, addr, _log) = spawn_beacon().await;
    let mut ws = connect(addr).await;

    ws.send(Message::text(r#"{"type":"ping","clientTs":111}"#))
        .await
        .unwrap();
    let first = next_json(&mut ws).await;
    assert_eq!(first["type"], "pong");
    assert_eq!(first["clientTs"], 111);
    let first_server_ts = first["serverTs"].as_u64().unwrap();

    ws.send(Message::text(r#"{"type":"ping","clientTs":222}"#))
        .await
        .unwrap();
    let second = next_json(&mut ws).await;
    assert_eq!(second["clientTs"], 222);
    let second_server_ts = second["serverTs"].as_u64().unwrap();

    assert!(second_server_ts >= first_server_ts);
}

#[tokio::test]
async fn malformed_frames_are_ignored_and_the_connection_survives() {
    let (_state, addr, _log) = spawn_beacon().await;
    let mut ws = connect(addr).await;

    ws.send(Message::text("this is not json")).await.unwrap();
    ws.send(Message::text(r#"{"type":"subscribe"}"#))
        .await
        .unwrap();

    // The next reply is the pong for this ping; the garbage drew none.
    ws.send(Message::text(r#"{"type":"ping","clientTs":7}"#))
        .await
        .unwrap();
    let json = next_json(&mut ws).await;
    assert_eq!(json["type"], "pong");
    assert_eq!(json["clientTs"], 7);
}

#[tokio::test]
async fn implausible_clock_values_are_reported_as_failure() {
    let (_state, addr, _log) = spawn_beacon().await;
    let mut ws = connect(addr).await;

    ws.send(Message::text(r#"{"type":"set_clock","clientMs":123}"#))
        .await
        .unwrap();
    let json = next_json(&mut ws).await;
    assert_eq!(json["type"], "clock_set");
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn track_reports_reset_the_sync_log() {
    let (_state, addr, log_path) = spawn_beacon().await;
    let mut ws = connect(addr).await;

    ws.send(Message::text(
        r#"{"type":"report","event":"TRACK","track":"MyShow"}"#,
    ))
    .await
    .unwrap();

    // The write happens inside the session task; poll for it briefly.
    let mut contents = String::new();
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if let Ok(text) = std::fs::read_to_string(&log_path) {
            contents = text;
            if !contents.is_empty() {
                break;
            }
        }
    }
    assert!(
        contents.starts_with("--- NEW TRACK: MyShow @ "),
        "log should start with the new-track marker, got: {contents:?}"
    );
}

#[tokio::test]
async fn disconnecting_removes_the_session_from_the_registry() {
    let (state, addr, _log) = spawn_beacon().await;
    let ws = connect(addr).await;

    // Registration happens right after the upgrade; wait for it.
    let mut registered = false;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if state.hub().client_count().await == 1 {
            registered = true;
            break;
        }
    }
    assert!(registered, "session should register after connect");

    drop(ws);
    let mut unregistered = false;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if state.hub().client_count().await == 0 {
            unregistered = true;
            break;
        }
    }
    assert!(unregistered, "session should unregister after disconnect");
}
