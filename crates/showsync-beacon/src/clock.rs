//! Wall-clock helpers and host clock stepping.
//!
//! Every timestamp the beacon hands to listeners is Unix milliseconds from
//! the host's wall clock. The admin client can also ask for the host clock
//! to be stepped (show controllers often run without a battery-backed
//! clock or network time); the step is delegated to the system `date`
//! command rather than reimplementing any part of NTP.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::process::Command;

/// Lowest value accepted as a plausible Unix-epoch-millisecond timestamp
/// (roughly September 2001). Anything at or below this is a client bug,
/// not a real clock reading.
pub const MIN_PLAUSIBLE_UNIX_MS: u64 = 1_000_000_000_000;

/// How long the external clock-step command may run before being abandoned.
const CLOCK_SET_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from a host clock-step request.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// The client-supplied value is not a plausible epoch-millisecond
    /// timestamp.
    #[error("implausible clock value: {client_ms} ms")]
    Implausible {
        /// The rejected timestamp.
        client_ms: u64,
    },

    /// The `date` command could not be spawned or awaited.
    #[error("clock command failed to run: {0}")]
    Command(String),

    /// The `date` command ran and reported failure (typically missing
    /// privileges).
    #[error("clock command exited with {status}: {stderr}")]
    Rejected {
        /// Exit status of the command.
        status: std::process::ExitStatus,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The command did not finish within the timeout.
    #[error("clock command timed out")]
    Timeout,
}

/// Current wall clock as Unix milliseconds.
///
/// Returns 0 if the system clock reads before the epoch.
pub fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
        })
}

/// Step the host system clock to the given Unix-epoch-millisecond value.
///
/// The value is validated against [`MIN_PLAUSIBLE_UNIX_MS`] and truncated
/// to whole seconds (`date -s @<sec>` takes no sub-second precision).
///
/// # Errors
///
/// Returns [`ClockError`] when the value is implausible, the command
/// cannot run, exits non-zero, or times out. None of these are fatal to
/// the caller; the session handler reports them back as `success:false`.
pub async fn set_system_clock(client_ms: u64) -> Result<(), ClockError> {
    if client_ms <= MIN_PLAUSIBLE_UNIX_MS {
        return Err(ClockError::Implausible { client_ms });
    }

    // Safe: the divisor is a non-zero literal.
    let unix_sec = client_ms.checked_div(1000).unwrap_or(0);

    let output = tokio::time::timeout(
        CLOCK_SET_TIMEOUT,
        Command::new("date")
            .arg("-s")
            .arg(format!("@{unix_sec}"))
            .output(),
    )
    .await
    .map_err(|_elapsed| ClockError::Timeout)?
    .map_err(|e| ClockError::Command(e.to_string()))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(ClockError::Rejected {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}
