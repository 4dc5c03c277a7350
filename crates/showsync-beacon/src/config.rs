//! Configuration loading and typed config structures for the beacon.
//!
//! The canonical configuration lives in `showsync-config.yaml` next to the
//! daemon. This module defines strongly-typed structs that mirror the YAML
//! structure and a loader that reads the file. Everything is static at
//! startup; there is no runtime reconfiguration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level beacon configuration.
///
/// Mirrors the structure of `showsync-config.yaml`. All fields have
/// defaults matching a standard controller deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BeaconConfig {
    /// Listen address settings.
    #[serde(default)]
    pub listen: ListenConfig,

    /// Upstream status polling settings.
    #[serde(default)]
    pub poller: PollerConfig,

    /// Media directory settings.
    #[serde(default)]
    pub media: MediaConfig,

    /// Telemetry log settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BeaconConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for deployment:
    /// - `LISTEN_PORT` overrides `listen.port`
    /// - `STATUS_URL` overrides `poller.status_url`
    /// - `MUSIC_DIR` overrides `media.music_dir`
    /// - `SYNC_LOG` overrides `telemetry.sync_log`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override deployment-specific values with environment variables when
    /// set. Lets a service unit point one build at different controllers
    /// without editing the YAML file. Called automatically by the loaders;
    /// public so a config built from [`Default`] gets the same treatment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LISTEN_PORT") {
            if let Ok(port) = val.parse() {
                self.listen.port = port;
            }
        }
        if let Ok(val) = std::env::var("STATUS_URL") {
            self.poller.status_url = val;
        }
        if let Ok(val) = std::env::var("MUSIC_DIR") {
            self.media.music_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("SYNC_LOG") {
            self.telemetry.sync_log = PathBuf::from(val);
        }
    }
}

/// Listen address configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListenConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on. The reverse proxy forwards `/ws` here.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Upstream status polling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PollerConfig {
    /// Controller status endpoint, polled read-only.
    #[serde(default = "default_status_url")]
    pub status_url: String,

    /// Target poll cadence in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Hard timeout on each status fetch in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Minimum sleep between cycles in milliseconds. Keeps a slow
    /// upstream from turning the poll loop into a busy spin.
    #[serde(default = "default_min_sleep_ms")]
    pub min_sleep_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            status_url: default_status_url(),
            poll_interval_ms: default_poll_interval_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            min_sleep_ms: default_min_sleep_ms(),
        }
    }
}

/// Media directory configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaConfig {
    /// Directory holding audio files matching sequence base names.
    #[serde(default = "default_music_dir")]
    pub music_dir: PathBuf,

    /// Public URL prefix under which the media directory is served.
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            music_dir: default_music_dir(),
            url_prefix: default_url_prefix(),
        }
    }
}

/// Telemetry log configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelemetryConfig {
    /// Path of the client sync-report log file.
    #[serde(default = "default_sync_log")]
    pub sync_log: PathBuf,

    /// Size in bytes beyond which the log is rotated.
    #[serde(default = "default_max_log_bytes")]
    pub max_log_bytes: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sync_log: default_sync_log(),
            max_log_bytes: default_max_log_bytes(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes
    /// precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

fn default_status_url() -> String {
    "http://127.0.0.1/api/fppd/status".to_owned()
}

const fn default_poll_interval_ms() -> u64 {
    200
}

const fn default_fetch_timeout_ms() -> u64 {
    1_000
}

const fn default_min_sleep_ms() -> u64 {
    10
}

fn default_music_dir() -> PathBuf {
    PathBuf::from("/home/fpp/media/music")
}

fn default_url_prefix() -> String {
    "/music".to_owned()
}

fn default_sync_log() -> PathBuf {
    PathBuf::from("/var/lib/showsync/sync.log")
}

const fn default_max_log_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_owned()
}
