// Playback updates - state changes delivered to the UI layer
// Explicit channel instead of implicit reactivity: the worker pushes, the UI polls

use crate::audio::sink::RenderError;
use crate::sequencer::timeline::Payload;

/// Why a session ended
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// User asked for a stop
    Requested,
    /// Finite timeline played to its end
    Finished,
    /// The render sink failed; not retried
    Fault(RenderError),
}

/// One playback state change.
///
/// Delivery is lossy: a slow consumer drops updates, never blocks playback.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackUpdate {
    /// Session started; first event due at `first_due` (audio-clock seconds)
    Started { first_due: f64 },

    /// An audible step was committed to the sink
    Step {
        /// Timeline index of the step
        index: usize,
        /// Audio-clock time at which it will sound
        due: f64,
        /// The step's payload (click type or note/chord labels)
        payload: Payload,
    },

    /// Session ended and returned to idle
    Stopped { reason: StopReason },
}
