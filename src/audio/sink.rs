// Render sink boundary - audio-clock reads and tone scheduling
// The scheduler only talks to this trait; the cpal engine implements it

/// Render-side failures surfaced to the playback controller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("no audio output device available: {0}")]
    DeviceUnavailable(String),

    #[error("audio device closed")]
    DeviceClosed,

    #[error("tone command queue full")]
    QueueFull,
}

/// One committed event: a tone to sound at an absolute audio-clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneCommand {
    /// Oscillator frequency in Hz
    pub frequency: f32,
    /// Absolute start time in audio-clock seconds
    pub start: f64,
    /// Sounding duration in seconds
    pub duration: f64,
    /// Peak gain, linear
    pub gain: f32,
}

/// Commands crossing from the scheduling thread into the audio callback.
///
/// `Flush` travels in-band so it drops exactly the tones committed before it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SinkCommand {
    Tone(ToneCommand),
    Flush,
}

/// The boundary the scheduler drives.
///
/// `now` reads a monotonic audio-clock (arbitrary epoch fixed at sink
/// creation). `schedule_tone` must not block; commands for one session are
/// issued in non-decreasing `start` order. `flush` drops queued commands and
/// silences active voices. One playback controller owns a sink instance at a
/// time; sharing one across controllers needs external synchronization.
pub trait RenderSink: Send + Sync {
    fn now(&self) -> f64;

    fn schedule_tone(&self, tone: ToneCommand) -> Result<(), RenderError>;

    fn flush(&self);
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;

    /// Sink with a hand-advanced clock, for deterministic scheduler tests.
    pub struct ManualSink {
        now: Mutex<f64>,
        pub commands: Mutex<Vec<ToneCommand>>,
        pub fail_with: Mutex<Option<RenderError>>,
    }

    impl ManualSink {
        pub fn new() -> Self {
            Self {
                now: Mutex::new(0.0),
                commands: Mutex::new(Vec::new()),
                fail_with: Mutex::new(None),
            }
        }

        pub fn advance(&self, seconds: f64) {
            *self.now.lock().unwrap() += seconds;
        }

        pub fn committed(&self) -> Vec<ToneCommand> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl RenderSink for ManualSink {
        fn now(&self) -> f64 {
            *self.now.lock().unwrap()
        }

        fn schedule_tone(&self, tone: ToneCommand) -> Result<(), RenderError> {
            if let Some(err) = self.fail_with.lock().unwrap().clone() {
                return Err(err);
            }
            self.commands.lock().unwrap().push(tone);
            Ok(())
        }

        fn flush(&self) {
            let now = self.now();
            self.commands.lock().unwrap().retain(|t| t.start <= now);
        }
    }

    /// Sink whose clock follows wall time, for player loop tests.
    pub struct RealtimeSink {
        epoch: Instant,
        pub commands: Mutex<Vec<ToneCommand>>,
    }

    impl RealtimeSink {
        pub fn new() -> Self {
            Self {
                epoch: Instant::now(),
                commands: Mutex::new(Vec::new()),
            }
        }

        pub fn committed(&self) -> Vec<ToneCommand> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl RenderSink for RealtimeSink {
        fn now(&self) -> f64 {
            self.epoch.elapsed().as_secs_f64()
        }

        fn schedule_tone(&self, tone: ToneCommand) -> Result<(), RenderError> {
            self.commands.lock().unwrap().push(tone);
            Ok(())
        }

        fn flush(&self) {
            let now = self.now();
            self.commands.lock().unwrap().retain(|t| t.start <= now);
        }
    }
}
