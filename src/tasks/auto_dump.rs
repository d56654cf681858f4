//! Auto-Dump Task
//!
//! Background loop that periodically writes the cache to its dump file.
//! The loop can be stopped, restarted and re-timed while the process runs.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cache::TrackedCache;

/// Observable scheduler status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerState {
    /// Whether the loop is running
    pub enabled: bool,
    /// Seconds between dumps, 0 = disabled
    pub interval_seconds: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_success: Option<bool>,
    /// Ticks completed since the scheduler was created
    pub runs: u64,
}

struct RunningLoop {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

// == Auto-Dump Scheduler ==
/// Owns the auto-dump loop for one [`TrackedCache`].
///
/// `stop` cancels the pending sleep; a dump already in progress is allowed
/// to finish so the dump file is never half written.
pub struct AutoDumpScheduler {
    cache: Arc<TrackedCache>,
    runtime: Handle,
    running: Mutex<Option<RunningLoop>>,
    state: Arc<Mutex<SchedulerState>>,
}

impl AutoDumpScheduler {
    /// Creates a stopped scheduler. Loops are spawned on `runtime`.
    pub fn new(cache: Arc<TrackedCache>, interval_seconds: u64, runtime: Handle) -> Self {
        Self {
            cache,
            runtime,
            running: Mutex::new(None),
            state: Arc::new(Mutex::new(SchedulerState {
                interval_seconds,
                ..SchedulerState::default()
            })),
        }
    }

    // == Start ==
    /// Starts the loop. No-op if already running or if the interval is 0.
    ///
    /// Returns whether the loop is running afterwards.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock();
        if running.is_some() {
            return true;
        }

        let interval = self.state.lock().interval_seconds;
        if interval == 0 {
            info!("Auto-dump disabled (interval is 0)");
            return false;
        }

        *running = Some(self.spawn_loop(interval));
        self.state.lock().enabled = true;
        info!(interval_secs = interval, "Auto-dump started");
        true
    }

    // == Stop ==
    /// Stops the loop. Returns whether it was running.
    pub fn stop(&self) -> bool {
        self.halt().is_some()
    }

    /// Stops the loop and waits for an in-flight dump to finish.
    pub async fn stop_and_wait(&self) {
        if let Some(handle) = self.halt() {
            if let Err(err) = handle.await {
                error!(error = %err, "Auto-dump loop ended abnormally");
            }
        }
    }

    fn halt(&self) -> Option<JoinHandle<()>> {
        let stopped = self.running.lock().take()?;
        stopped.token.cancel();
        self.state.lock().enabled = false;
        info!("Auto-dump stopped");
        Some(stopped.handle)
    }

    // == Set Interval ==
    /// Changes the interval.
    ///
    /// A running loop is restarted with the new interval, or stopped when the
    /// new interval is 0. A stopped scheduler only remembers the value.
    pub fn set_interval(&self, interval_seconds: u64) {
        let mut running = self.running.lock();
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut state.interval_seconds, interval_seconds)
        };
        if previous == interval_seconds {
            return;
        }

        if let Some(old) = running.take() {
            old.token.cancel();
            if interval_seconds == 0 {
                self.state.lock().enabled = false;
                info!("Auto-dump disabled (interval set to 0)");
            } else {
                *running = Some(self.spawn_loop(interval_seconds));
                info!(interval_secs = interval_seconds, "Auto-dump interval changed");
            }
        } else {
            debug!(interval_secs = interval_seconds, "Auto-dump interval stored for next start");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    pub fn interval(&self) -> u64 {
        self.state.lock().interval_seconds
    }

    /// Copy of the current status.
    pub fn state(&self) -> SchedulerState {
        self.state.lock().clone()
    }

    fn spawn_loop(&self, interval_secs: u64) -> RunningLoop {
        let token = CancellationToken::new();
        let handle = self.runtime.spawn(run_loop(
            Arc::clone(&self.cache),
            Duration::from_secs(interval_secs),
            token.clone(),
            Arc::clone(&self.state),
        ));
        RunningLoop { token, handle }
    }
}

impl Drop for AutoDumpScheduler {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.token.cancel();
        }
    }
}

async fn run_loop(
    cache: Arc<TrackedCache>,
    interval: Duration,
    token: CancellationToken,
    state: Arc<Mutex<SchedulerState>>,
) {
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        // Not raced against the token: an in-flight dump always completes
        let result = cache.dump_cache().await;

        let mut state = state.lock();
        state.last_run_at = Some(Utc::now());
        state.runs += 1;
        match result {
            Ok(report) => {
                state.last_run_success = Some(true);
                info!(
                    entries = report.entries,
                    skipped = report.skipped,
                    "Auto-dump complete"
                );
            }
            Err(err) => {
                state.last_run_success = Some(false);
                error!(error = %err, "Auto-dump failed, retrying next tick");
            }
        }
    }
    debug!("Auto-dump loop exited");
}
