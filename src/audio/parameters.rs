// Atomic parameters - lock-free sharing of mutable values between threads
// Bit-casts f64 into an AtomicU64 so tempo and gain changes never lock

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe f64 parameter using atomic operations.
///
/// Used for values mutated from the control side mid-playback (BPM, master
/// gain) and read every scheduling pass or audio callback.
#[derive(Clone)]
pub struct AtomicF64 {
    inner: Arc<AtomicU64>,
}

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self {
            inner: Arc::new(AtomicU64::new(value.to_bits())),
        }
    }

    pub fn set(&self, value: f64) {
        self.inner.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.inner.load(Ordering::Relaxed))
    }
}

impl Default for AtomicF64 {
    fn default() -> Self {
        Self::new(0.0)
    }
}
