// Playback controller - session lifecycle around the look-ahead scheduler
// One worker loop per session, cancelled through an atomic token

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::audio::parameters::AtomicF64;
use crate::audio::sink::RenderSink;
use crate::messaging::channels::{UpdateConsumer, UpdateProducer, create_update_channel};
use crate::messaging::update::{PlaybackUpdate, StopReason};
use crate::sequencer::scheduler::{LookaheadScheduler, Pass, SchedulerConfig};
use crate::sequencer::tempo::{Tempo, TempoError};
use crate::sequencer::timeline::Timeline;
use ringbuf::traits::Producer;

/// Lead-in between `start` and the first audible event, seconds
const START_DELAY: f64 = 0.05;

/// Update channel capacity. A measure of sixteenth-note steps at 300 BPM
/// produces well under 100 updates per second; 256 gives a polling UI
/// seconds of slack before deliveries drop.
const UPDATE_CHANNEL_CAPACITY: usize = 256;

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPING: u8 = 2;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No session
    Idle,
    /// Worker loop scheduling events
    Running,
    /// Finite timeline exhausted; draining until committed audio has sounded
    Stopping,
}

/// Playback control errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlayerError {
    #[error("no timeline selected")]
    NoTimeline,

    #[error("timeline has no steps")]
    EmptyTimeline,

    #[error(transparent)]
    Tempo(#[from] TempoError),
}

/// State shared between the controller and its worker loop
struct Shared {
    state: AtomicU8,
    looping: AtomicBool,
    bpm: AtomicF64,
    cancel: AtomicBool,
}

/// Playback controller owning scheduler lifecycle and the wake loop.
///
/// At most one worker loop exists per controller; `start` while running is a
/// no-op and `stop` is idempotent and safe from teardown paths. Tempo and
/// loop-mode changes apply on the next scheduling pass; selecting a new
/// timeline while running restarts the cursor at step 0.
pub struct Player {
    sink: Arc<dyn RenderSink>,
    config: SchedulerConfig,
    shared: Arc<Shared>,
    timeline: Option<Arc<Timeline>>,
    grid: u32,
    updates: Arc<Mutex<UpdateProducer>>,
    worker: Option<JoinHandle<()>>,
}

impl Player {
    /// Creates an idle controller around an open sink.
    /// Returns the consumer end of the update channel for the UI layer.
    pub fn new(sink: Arc<dyn RenderSink>, config: SchedulerConfig) -> (Self, UpdateConsumer) {
        let (update_tx, update_rx) = create_update_channel(UPDATE_CHANNEL_CAPACITY);

        let player = Self {
            sink,
            config,
            shared: Arc::new(Shared {
                state: AtomicU8::new(STATE_IDLE),
                looping: AtomicBool::new(true),
                bpm: AtomicF64::new(120.0),
                cancel: AtomicBool::new(false),
            }),
            timeline: None,
            grid: 1,
            updates: Arc::new(Mutex::new(update_tx)),
            worker: None,
        };

        (player, update_rx)
    }

    pub fn state(&self) -> PlayerState {
        match self.shared.state.load(Ordering::Relaxed) {
            STATE_RUNNING => PlayerState::Running,
            STATE_STOPPING => PlayerState::Stopping,
            _ => PlayerState::Idle,
        }
    }

    /// Whether a session is active (running or draining)
    pub fn is_active(&self) -> bool {
        self.state() != PlayerState::Idle
    }

    /// Set BPM; validated and clamped exactly like [`Tempo::set_bpm`].
    /// Takes effect on the next scheduling pass, mid-playback included.
    pub fn set_bpm(&self, bpm: f64) -> Result<(), TempoError> {
        let tempo = Tempo::beats(bpm)?;
        self.shared.bpm.set(tempo.bpm());
        Ok(())
    }

    pub fn bpm(&self) -> f64 {
        self.shared.bpm.get()
    }

    pub fn set_looping(&self, looping: bool) {
        self.shared.looping.store(looping, Ordering::Relaxed);
    }

    pub fn is_looping(&self) -> bool {
        self.shared.looping.load(Ordering::Relaxed)
    }

    /// Selects the timeline and its grid resolution (subdivisions per beat).
    /// While running, playback restarts at step 0 with the new selection.
    pub fn set_timeline(&mut self, timeline: Timeline, grid: u32) -> Result<(), PlayerError> {
        if grid == 0 {
            return Err(TempoError::ZeroGrid.into());
        }

        let was_active = self.is_active();
        if was_active {
            self.stop();
        }
        self.timeline = Some(Arc::new(timeline));
        self.grid = grid;
        if was_active {
            self.start()?;
        }
        Ok(())
    }

    /// Starts a session. No-op if one is already active.
    pub fn start(&mut self) -> Result<(), PlayerError> {
        self.reap_finished_worker();
        if self.is_active() {
            return Ok(());
        }

        let timeline = self.timeline.clone().ok_or(PlayerError::NoTimeline)?;
        if timeline.is_empty() {
            return Err(PlayerError::EmptyTimeline);
        }

        self.shared.cancel.store(false, Ordering::Relaxed);
        self.shared.state.store(STATE_RUNNING, Ordering::Relaxed);

        let sink = Arc::clone(&self.sink);
        let shared = Arc::clone(&self.shared);
        let updates = Arc::clone(&self.updates);
        let config = self.config;
        let grid = self.grid;
        self.worker = Some(thread::spawn(move || {
            run_session(sink, shared, timeline, grid, config, updates);
        }));

        Ok(())
    }

    /// Stops the session: cancels the pending wake, flushes the sink, returns
    /// to idle. Safe to call at any time; a no-op when nothing is active.
    pub fn stop(&mut self) {
        self.shared.cancel.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.shared.state.store(STATE_IDLE, Ordering::Relaxed);
    }

    /// Toggle between start and stop (the front-ends' single button)
    pub fn toggle(&mut self) -> Result<(), PlayerError> {
        if self.is_active() {
            self.stop();
            Ok(())
        } else {
            self.start()
        }
    }

    // A session that ended on its own leaves a finished worker behind;
    // collect it before judging idleness.
    fn reap_finished_worker(&mut self) {
        if self.state() == PlayerState::Idle {
            if let Some(worker) = self.worker.take() {
                let _ = worker.join();
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The cooperative timing loop: one scheduling pass per wake, suspension
/// only between passes. Exhaustion drains committed audio before idling;
/// cancellation and sink faults exit immediately.
fn run_session(
    sink: Arc<dyn RenderSink>,
    shared: Arc<Shared>,
    timeline: Arc<Timeline>,
    grid: u32,
    config: SchedulerConfig,
    updates: Arc<Mutex<UpdateProducer>>,
) {
    let first_due = sink.now() + START_DELAY;
    let mut scheduler = LookaheadScheduler::new(config, first_due);
    let mut reason = StopReason::Finished;

    push_update(&updates, PlaybackUpdate::Started { first_due });

    loop {
        if shared.cancel.load(Ordering::Relaxed) {
            reason = StopReason::Requested;
            break;
        }

        if shared.state.load(Ordering::Relaxed) == STATE_RUNNING {
            let Ok(tempo) = Tempo::new(shared.bpm.get(), grid) else {
                break;
            };
            let looping = shared.looping.load(Ordering::Relaxed);

            let outcome = scheduler.pass(&*sink, &timeline, &tempo, looping, |index, step, due| {
                push_update(
                    &updates,
                    PlaybackUpdate::Step {
                        index,
                        due,
                        payload: step.payload.clone(),
                    },
                );
            });

            match outcome {
                Pass::Scheduled { .. } => {}
                Pass::Exhausted => {
                    shared.state.store(STATE_STOPPING, Ordering::Relaxed);
                }
                Pass::Fault(err) => {
                    reason = StopReason::Fault(err);
                    break;
                }
            }
        } else if sink.now() >= scheduler.cursor().next_time {
            // Drained: everything committed has sounded
            break;
        }

        thread::sleep(config.wake_interval);
    }

    sink.flush();
    shared.state.store(STATE_IDLE, Ordering::Relaxed);
    push_update(&updates, PlaybackUpdate::Stopped { reason });
}

fn push_update(updates: &Arc<Mutex<UpdateProducer>>, update: PlaybackUpdate) {
    if let Ok(mut tx) = updates.lock() {
        let _ = tx.try_push(update);
    }
}
