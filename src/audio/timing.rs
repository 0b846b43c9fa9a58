// Audio clock - monotonic sample-position time for scheduling
// The callback advances it; everything else only reads

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared audio-clock state.
///
/// The epoch is fixed at sink creation (position 0); `seconds` is the
/// monotonic time reference the scheduler computes event times against, so
/// scheduled timing does not depend on wall-clock callback jitter.
#[derive(Clone)]
pub struct AudioClock {
    /// Current sample position (incremented by the audio callback)
    position: Arc<AtomicU64>,
    sample_rate: f64,
}

impl AudioClock {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            position: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    /// Current sample position
    pub fn current_sample(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    /// Current time in seconds since the clock epoch
    pub fn seconds(&self) -> f64 {
        self.current_sample() as f64 / self.sample_rate
    }

    /// Advance by `frames` samples (called from the audio callback)
    pub fn advance(&self, frames: usize) {
        self.position.fetch_add(frames as u64, Ordering::Relaxed);
    }

    /// Convert an absolute clock time to a sample position.
    /// Times before the epoch land on sample 0.
    pub fn seconds_to_sample(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        (seconds * self.sample_rate) as u64
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
