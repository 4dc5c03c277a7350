//! Client sync-report logging.
//!
//! Each `report` message a listener sends becomes one fixed-width line in
//! the sync log, timestamped locally and attributed to the client address.
//! A `TRACK` event resets the file (each song's telemetry starts clean;
//! cross-track comparisons are not meaningful here), and a size threshold
//! rotates the file to a `.old` sibling.
//!
//! Everything below the constructor is best-effort: I/O errors are logged
//! at debug level and dropped, so telemetry can never take the broadcast
//! path down with it.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use showsync_types::SyncReport;
use tracing::debug;

/// Event name that marks the start of a new track and resets the log.
const TRACK_EVENT: &str = "TRACK";

/// Errors that can occur while setting up the sync log.
///
/// Only construction can fail outward; a missing log directory at startup
/// is a deployment problem the daemon should refuse to run with.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The directory that should hold the log file could not be created.
    #[error("failed to create log directory {dir}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        dir: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Append-only sync-quality log with size rotation and per-track reset.
#[derive(Debug)]
pub struct SyncLog {
    path: PathBuf,
    max_bytes: u64,
}

impl SyncLog {
    /// Create the log handle, ensuring the parent directory exists.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::CreateDir`] when the parent directory
    /// cannot be created.
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64) -> Result<Self, TelemetryError> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|source| TelemetryError::CreateDir {
                    dir: dir.to_owned(),
                    source,
                })?;
            }
        }
        Ok(Self { path, max_bytes })
    }

    /// Path of the live log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a service-start separator line, marking restarts in the log.
    /// Best-effort.
    pub fn log_startup(&self) {
        let line = format!("\n--- showsync started {} ---\n", Local::now().to_rfc3339());
        if let Err(e) = self.append(&line) {
            debug!(error = %e, "startup separator write failed");
        }
    }

    /// Record one client report.
    ///
    /// `TRACK` events reset the file to a single separator line; every
    /// other event appends one fixed-width line, rotating first when the
    /// file has outgrown its size budget. Never fails outward.
    pub fn log_report(&self, client_ip: &str, report: &SyncReport) {
        if let Err(e) = self.write_report(client_ip, report) {
            debug!(error = %e, "sync log write failed");
        }
    }

    fn write_report(&self, client_ip: &str, report: &SyncReport) -> std::io::Result<()> {
        if report.event == TRACK_EVENT {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
            let line = format!(
                "--- NEW TRACK: {} @ {} [{client_ip}] ---\n",
                report.track,
                timestamp()
            );
            return self.append(&line);
        }

        self.rotate_if_needed()?;

        let line = format!(
            "{} [{client_ip}] {:<12} fpp={:>7} target={:>7} local={:>7} err={:>5}ms avg2s={:>5}ms rate={:.4} eff={:.3} offset={:>4}ms\n",
            timestamp(),
            report.event,
            report.fpp,
            report.target,
            report.local,
            report.err,
            report.avg2s,
            report.rate,
            report.eff,
            report.offset,
        );
        self.append(&line)
    }

    /// Rename the live file to its `.old` sibling once it exceeds the size
    /// budget, replacing any previous `.old`.
    fn rotate_if_needed(&self) -> std::io::Result<()> {
        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            // No file yet: nothing to rotate.
            Err(_) => return Ok(()),
        };
        if size <= self.max_bytes {
            return Ok(());
        }

        let old = self.path.with_extension("log.old");
        if old.exists() {
            fs::remove_file(&old)?;
        }
        fs::rename(&self.path, &old)
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

/// Local timestamp with millisecond precision, matching the log layout.
fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Fresh log path in a scratch directory.
    fn scratch_log() -> PathBuf {
        std::env::temp_dir()
            .join(format!("showsync-telemetry-{}", uuid::Uuid::now_v7()))
            .join("sync.log")
    }

    fn tick_report(event: &str) -> SyncReport {
        SyncReport {
            event: event.to_owned(),
            fpp: 1_000,
            target: 1_010,
            local: 990,
            err: 20,
            avg2s: 15,
            rate: 1.002,
            eff: 0.998,
            offset: -3,
            track: String::from("MyShow"),
        }
    }

    #[test]
    fn new_creates_the_parent_directory() {
        let path = scratch_log();
        let log = SyncLog::new(&path, 1024).unwrap();
        assert!(log.path().parent().unwrap().is_dir());
    }

    #[test]
    fn report_lines_have_the_fixed_layout() {
        let log = SyncLog::new(scratch_log(), 5 * 1024 * 1024).unwrap();
        log.log_report("10.0.0.7", &tick_report("TICK"));

        let contents = fs::read_to_string(log.path()).unwrap();
        assert!(contents.contains("[10.0.0.7] TICK"));
        assert!(contents.contains("fpp=   1000"));
        assert!(contents.contains("err=   20ms"));
        assert!(contents.contains("rate=1.0020"));
        assert!(contents.contains("eff=0.998"));
        assert!(contents.contains("offset=  -3ms"));
    }

    #[test]
    fn track_event_resets_the_file() {
        let log = SyncLog::new(scratch_log(), 5 * 1024 * 1024).unwrap();
        log.log_report("10.0.0.7", &tick_report("TICK"));
        log.log_report("10.0.0.7", &tick_report("TICK"));
        log.log_report("10.0.0.7", &tick_report(TRACK_EVENT));

        let contents = fs::read_to_string(log.path()).unwrap();
        let first_line = contents.lines().next().unwrap();
        assert!(first_line.starts_with("--- NEW TRACK: MyShow @ "));
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn oversized_file_rotates_exactly_once() {
        let path = scratch_log();
        // Tiny budget so the second write triggers rotation.
        let log = SyncLog::new(&path, 16).unwrap();

        // A stale .old from an earlier rotation gets replaced.
        let old = path.with_extension("log.old");
        fs::write(&old, b"stale\n").unwrap();

        log.log_report("10.0.0.7", &tick_report("TICK"));
        let first = fs::read_to_string(&path).unwrap();
        log.log_report("10.0.0.7", &tick_report("SEEK"));

        let rotated = fs::read_to_string(&old).unwrap();
        assert_eq!(rotated, first);
        let live = fs::read_to_string(&path).unwrap();
        assert_eq!(live.lines().count(), 1);
        assert!(live.contains("SEEK"));
    }

    #[test]
    fn io_failures_are_swallowed() {
        // Point the log at a directory: every write fails, nothing panics.
        let dir = std::env::temp_dir().join(format!("showsync-telemetry-{}", uuid::Uuid::now_v7()));
        fs::create_dir_all(&dir).unwrap();
        let log = SyncLog {
            path: dir,
            max_bytes: 1024,
        };
        log.log_report("10.0.0.7", &tick_report("TICK"));
        log.log_startup();
    }
}
