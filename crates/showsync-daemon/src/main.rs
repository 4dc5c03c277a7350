//! Process entry point for the `ShowSync` beacon.
//!
//! The daemon wires the service together and runs it for the process
//! lifetime:
//!
//! ```text
//! config -> sync log -> AppState -> poller task
//!                                -> HTTP + WS server (blocks)
//! ```
//!
//! Startup failures -- an unreadable config file, an uncreatable log
//! directory, an unbindable listen port -- are fatal before serving.
//! Everything after that point is handled inside the components and
//! never terminates the process.

use std::path::Path;
use std::sync::Arc;

use showsync_beacon::audio::AudioResolver;
use showsync_beacon::config::BeaconConfig;
use showsync_beacon::poller::StatusPoller;
use showsync_beacon::state::AppState;
use showsync_beacon::telemetry::SyncLog;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Config file consulted when no path argument is given.
const DEFAULT_CONFIG_PATH: &str = "showsync-config.yaml";

/// Application entry point.
///
/// Initializes logging, loads configuration, creates the telemetry log,
/// spawns the status poller, and serves listeners until the process is
/// terminated.
///
/// # Errors
///
/// Returns an error when startup fails: unreadable configuration, log
/// directory creation failure, HTTP client construction failure, or an
/// unbindable listen address.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    // Initialize structured logging; RUST_LOG wins over the config level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_target(true)
        .init();

    info!("showsync-daemon starting");
    info!(
        listen = format!("{}:{}", config.listen.host, config.listen.port),
        status_url = config.poller.status_url,
        poll_interval_ms = config.poller.poll_interval_ms,
        music_dir = %config.media.music_dir.display(),
        sync_log = %config.telemetry.sync_log.display(),
        "configuration loaded"
    );

    // Log directory trouble is a startup failure; write errors after this
    // point are swallowed by the log itself.
    let sync_log = SyncLog::new(
        config.telemetry.sync_log.clone(),
        config.telemetry.max_log_bytes,
    )?;
    sync_log.log_startup();

    let state = Arc::new(AppState::new(sync_log));
    let audio = Arc::new(AudioResolver::new(
        config.media.music_dir.clone(),
        config.media.url_prefix.clone(),
    ));

    let poller = StatusPoller::new(&config.poller, Arc::clone(&state), audio)?;
    tokio::spawn(poller.run());

    showsync_beacon::start_server(&config.listen, state).await?;

    Ok(())
}

/// Read configuration from the path argument, the default file, or
/// built-in defaults when neither exists. Environment overrides apply in
/// every case.
fn load_config() -> Result<BeaconConfig, Box<dyn std::error::Error>> {
    if let Some(path) = std::env::args().nth(1) {
        return Ok(BeaconConfig::from_file(Path::new(&path))?);
    }

    let default = Path::new(DEFAULT_CONFIG_PATH);
    if default.exists() {
        return Ok(BeaconConfig::from_file(default)?);
    }

    // No file anywhere: defaults plus environment overrides.
    let mut config = BeaconConfig::default();
    config.apply_env_overrides();
    Ok(config)
}
