//! `ShowSync` beacon service library.
//!
//! The beacon keeps a single [`PlaybackSnapshot`](showsync_types::PlaybackSnapshot)
//! current by polling the show controller's status API, and fans every
//! refresh out to all connected listener `WebSocket` sessions. Listeners run
//! a ping/pong clock-offset protocol over the same socket, may ask the
//! host to step its system clock, and submit sync-quality telemetry that
//! lands in a rotating log file.
//!
//! # Architecture
//!
//! ```text
//! controller HTTP API --> poller --> AppState snapshot --> hub fan-out --> sessions
//!                                                          sessions --> telemetry log
//! ```
//!
//! The poller is the sole writer of the snapshot. The hub's registry is
//! the single source of truth for fan-out targets, and a stalled session
//! can never delay delivery to a healthy one: frames are offered to each
//! session's bounded queue without blocking, and sessions that cannot
//! keep up are dropped.

pub mod audio;
pub mod clock;
pub mod config;
pub mod handlers;
pub mod hub;
pub mod poller;
pub mod router;
pub mod server;
pub mod state;
pub mod status;
pub mod telemetry;
pub mod ws;

// Re-export primary types for convenience.
pub use config::{BeaconConfig, ConfigError};
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
