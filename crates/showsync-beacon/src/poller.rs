//! Fixed-cadence polling of the show controller.
//!
//! The poller is the system's only producer: every cycle it fetches the
//! controller's status, stamps it with the midpoint of the request
//! window, normalizes it, and hands the result to
//! [`AppState::apply_poll`], which replaces the snapshot and triggers the
//! fan-out. A failed fetch is never fatal -- the previous snapshot's body
//! is carried over with a refreshed timestamp.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::audio::AudioResolver;
use crate::clock::now_unix_ms;
use crate::config::PollerConfig;
use crate::state::AppState;
use crate::status::normalize_status;

/// Errors from poller construction.
#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Polls the controller status endpoint and feeds the broadcast hub.
#[derive(Debug)]
pub struct StatusPoller {
    client: reqwest::Client,
    status_url: String,
    interval: Duration,
    min_sleep: Duration,
    state: Arc<AppState>,
    audio: Arc<AudioResolver>,
}

impl StatusPoller {
    /// Build a poller from configuration. The fetch timeout is baked into
    /// the HTTP client so every request carries it.
    ///
    /// # Errors
    ///
    /// Returns [`PollerError::Client`] when the HTTP client cannot be
    /// constructed.
    pub fn new(
        config: &PollerConfig,
        state: Arc<AppState>,
        audio: Arc<AudioResolver>,
    ) -> Result<Self, PollerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.fetch_timeout_ms))
            .build()
            .map_err(|e| PollerError::Client(e.to_string()))?;

        Ok(Self {
            client,
            status_url: config.status_url.clone(),
            interval: Duration::from_millis(config.poll_interval_ms),
            min_sleep: Duration::from_millis(config.min_sleep_ms),
            state,
            audio,
        })
    }

    /// Run the poll loop until the process shuts down.
    ///
    /// Failing-streak transitions are logged once at the edges instead of
    /// every cycle. The sleep floor keeps a slow upstream from turning
    /// the loop into a busy spin when fetch latency exceeds the cadence.
    pub async fn run(self) {
        info!(
            url = self.status_url,
            interval_ms = self.interval.as_millis(),
            "status poller started"
        );

        let mut failing = false;
        loop {
            let started = Instant::now();
            let fetched = self.cycle().await;

            if fetched && failing {
                info!("controller status fetch recovered");
            } else if !fetched && !failing {
                warn!(
                    url = self.status_url,
                    "controller status fetch failing, broadcasting last snapshot"
                );
            }
            failing = !fetched;

            let sleep_for = self
                .interval
                .saturating_sub(started.elapsed())
                .max(self.min_sleep);
            tokio::time::sleep(sleep_for).await;
        }
    }

    /// Advance one poll cycle. Returns whether the upstream yielded a
    /// usable payload.
    ///
    /// The snapshot timestamp is the midpoint of the request window -- the
    /// best unbiased estimate of the instant the controller sampled its
    /// position, since the true sample instant inside the call is unknown.
    pub async fn cycle(&self) -> bool {
        let before = now_unix_ms();
        let raw = self.fetch_status().await;
        let after = now_unix_ms();
        let server_time_ms = before.midpoint(after);

        let fresh = raw
            .as_ref()
            .and_then(|value| normalize_status(value, server_time_ms, &self.audio));
        let fetched = fresh.is_some();

        self.state.apply_poll(fresh, server_time_ms).await;
        fetched
    }

    /// Fetch and parse the upstream status body. Any failure -- connect
    /// error, timeout, HTTP error status, malformed body -- collapses to
    /// `None`.
    async fn fetch_status(&self) -> Option<Value> {
        let response = match self.client.get(&self.status_url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "status fetch failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(status = %response.status(), "status fetch returned error");
            return None;
        }

        match response.json::<Value>().await {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(error = %e, "status body unreadable");
                None
            }
        }
    }
}
