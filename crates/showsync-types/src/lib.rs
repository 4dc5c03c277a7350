//! Shared type definitions for the `ShowSync` beacon.
//!
//! This crate is the single source of truth for everything that crosses the
//! `WebSocket` between the beacon and its listener clients. Types defined here
//! flow downstream to `TypeScript` via `ts-rs` for the browser listener.
//!
//! # Modules
//!
//! - [`snapshot`] -- the playback snapshot broadcast to every listener
//! - [`protocol`] -- tagged client/server control messages (ping/pong,
//!   clock set)
//! - [`report`] -- the sync-quality telemetry payload clients submit

pub mod protocol;
pub mod report;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use protocol::{ClientMessage, ServerMessage};
pub use report::SyncReport;
pub use snapshot::{PlaybackSnapshot, PlaybackState};
