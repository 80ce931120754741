//! Feedback poller: low-priority live progress reporting.
//!
//! Polls the vehicle's read-only state probe at a fixed interval and
//! publishes the latest reading to [`SharedFeedback`]. It never touches the
//! pose estimate. Exits on cancellation, on an explicit stop request, or on
//! the first probe error.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::flight::StateProbe;
use crate::shared::{CancellationToken, FeedbackSnapshot, SharedFeedback};

/// Granularity of the interruptible sleep between polls.
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Handle to a running feedback poller thread.
pub struct FeedbackPoller {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

impl FeedbackPoller {
    /// Spawn the poller. Returns `None` if the thread could not be created;
    /// the flight continues without live feedback in that case.
    pub fn spawn(
        probe: Box<dyn StateProbe>,
        interval: Duration,
        cancel: CancellationToken,
        feedback: SharedFeedback,
    ) -> Option<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let spawned = thread::Builder::new()
            .name("feedback".into())
            .spawn(move || run(probe, interval, cancel, thread_stop, feedback));

        match spawned {
            Ok(handle) => Some(Self { handle, stop }),
            Err(e) => {
                tracing::warn!("Failed to spawn feedback thread: {}", e);
                None
            }
        }
    }

    /// Ask the poller to exit at its next check.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop and wait up to `timeout` for the thread to exit.
    ///
    /// Returns `true` if the thread was joined. A poller still running after
    /// the timeout is detached.
    pub fn stop_and_join(self, timeout: Duration) -> bool {
        self.stop();
        let deadline = Instant::now() + timeout;
        while !self.handle.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!(
                    "Feedback thread did not stop within {:?}, detaching",
                    timeout
                );
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        if self.handle.join().is_err() {
            tracing::error!("Feedback thread panicked");
        }
        true
    }
}

fn run(
    probe: Box<dyn StateProbe>,
    interval: Duration,
    cancel: CancellationToken,
    stop: Arc<AtomicBool>,
    feedback: SharedFeedback,
) {
    tracing::debug!("Feedback thread started");
    let should_exit = || cancel.is_cancelled() || stop.load(Ordering::Acquire);

    while !should_exit() {
        let reading = probe
            .speed_x()
            .and_then(|vx| Ok((vx, probe.speed_y()?, probe.height()?)));

        match reading {
            Ok((vx, vy, height)) => {
                let snapshot = FeedbackSnapshot {
                    speed: vx.hypot(vy),
                    height,
                };
                tracing::debug!(
                    "Feedback: z={:.0}cm v={:.1}cm/s",
                    snapshot.height,
                    snapshot.speed
                );
                *feedback.write() = Some(snapshot);
            }
            Err(e) => {
                tracing::warn!("Feedback probe failed: {}", e);
                break;
            }
        }

        // Sleep in slices so a stop request is seen quickly
        let wake = Instant::now() + interval;
        while !should_exit() {
            let now = Instant::now();
            if now >= wake {
                break;
            }
            thread::sleep((wake - now).min(STOP_CHECK_INTERVAL));
        }
    }

    tracing::debug!("Feedback thread exited");
}
