//! State shared between the flight thread, the feedback poller and any
//! telemetry consumers.
//!
//! Only two things are written from more than one thread: the cancellation
//! flag (atomic) and the telemetry channel (internally synchronized).
//! Everything else has a single writer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::{Mutex, RwLock};

/// Cooperative cancellation flag for one flight attempt.
///
/// Clones share the same flag. Setting it is idempotent.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Returns `true` only for the call that set the flag.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// One timestamped snapshot of the estimated flight state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TelemetrySample {
    /// Seconds since the flight started
    pub time_s: f32,
    /// Dead-reckoned position (cm)
    pub x: f32,
    pub y: f32,
    /// Measured height (cm)
    pub z: f32,
    /// Attitude (degrees)
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    /// Achieved speed over the last segment (cm/s)
    pub speed: f32,
    /// Index of the waypoint the sample was taken at
    pub waypoint_index: usize,
}

/// Receiving end handed to a telemetry consumer.
pub type TelemetryReceiver = Receiver<TelemetrySample>;

/// Fan-out telemetry hand-off.
///
/// Every subscriber gets its own bounded queue. Publishing never blocks:
/// a full queue drops the sample for that subscriber only, and
/// disconnected subscribers are pruned.
#[derive(Clone, Debug)]
pub struct TelemetryChannel {
    inner: Arc<ChannelInner>,
}

#[derive(Debug)]
struct ChannelInner {
    subscribers: Mutex<Vec<Sender<TelemetrySample>>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl TelemetryChannel {
    /// Create a channel whose subscribers each buffer up to `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                subscribers: Mutex::new(Vec::new()),
                capacity: capacity.max(1),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new consumer.
    pub fn subscribe(&self) -> TelemetryReceiver {
        let (tx, rx) = bounded(self.inner.capacity);
        self.inner.subscribers.lock().push(tx);
        rx
    }

    /// Offer a sample to every subscriber. Returns how many accepted it.
    pub fn publish(&self, sample: &TelemetrySample) -> usize {
        let mut delivered = 0;
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(*sample) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        delivered
    }

    /// Number of samples dropped because a subscriber queue was full.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

impl Default for TelemetryChannel {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Thread-safe, append-only telemetry history (written by the flight thread).
pub type SharedHistory = Arc<RwLock<Vec<TelemetrySample>>>;

/// Latest reading from the feedback poller.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FeedbackSnapshot {
    /// Horizontal speed magnitude (cm/s)
    pub speed: f32,
    /// Height (cm)
    pub height: f32,
}

/// Thread-safe live feedback (written by the feedback poller).
pub type SharedFeedback = Arc<RwLock<Option<FeedbackSnapshot>>>;
