// Look-ahead scheduler - commits timeline steps to the render sink ahead of the audio clock
// The heart of the crate: coarse wakes in, sample-accurate commits out

use std::time::Duration;

use crate::audio::sink::{RenderError, RenderSink, ToneCommand};
use crate::sequencer::tempo::Tempo;
use crate::sequencer::timeline::{ClickType, Payload, Step, Timeline};

/// Accent click profile (frequency Hz, peak gain)
const ACCENT_CLICK: (f32, f32) = (1200.0, 0.6);
/// Regular click profile
const REGULAR_CLICK: (f32, f32) = (800.0, 0.4);
/// Click burst length in seconds, independent of tempo
const CLICK_SECONDS: f64 = 0.1;
/// Peak gain for pitched tones
const TONE_GAIN: f32 = 0.2;

/// Scheduling window parameters.
///
/// `wake_interval` must stay well below `schedule_ahead`: every event inside
/// the look-ahead window is committed before the next wake, so a late wake
/// cannot skip anything as long as the window outlasts the delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// How far into the future events are committed to the sink
    pub schedule_ahead: Duration,
    /// Nominal interval between wakes of the scheduling loop
    pub wake_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            schedule_ahead: Duration::from_millis(100),
            wake_interval: Duration::from_millis(25),
        }
    }
}

/// Position tracker walking the timeline.
///
/// `next_time` only ever accumulates: on a loop wrap the index resets to 0
/// but the time keeps increasing, so loop boundaries introduce no drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleCursor {
    pub next_index: usize,
    pub next_time: f64,
}

/// Outcome of one scheduling pass
#[derive(Debug, Clone, PartialEq)]
pub enum Pass {
    /// Committed `committed` audible events; keep waking
    Scheduled { committed: usize },
    /// Finite timeline walked past its end (or nothing left playable)
    Exhausted,
    /// The sink refused a commit; surfaced to the playback controller
    Fault(RenderError),
}

/// Look-ahead scheduler state for one playback run.
pub struct LookaheadScheduler {
    cursor: ScheduleCursor,
    config: SchedulerConfig,
}

impl LookaheadScheduler {
    /// Creates a scheduler whose first event is due at `start_time`
    /// (audio-clock seconds).
    pub fn new(config: SchedulerConfig, start_time: f64) -> Self {
        Self {
            cursor: ScheduleCursor {
                next_index: 0,
                next_time: start_time,
            },
            config,
        }
    }

    pub fn cursor(&self) -> &ScheduleCursor {
        &self.cursor
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Runs one scheduling pass.
    ///
    /// Commits every event due inside the look-ahead window. The loop (not a
    /// single `if`) is what makes delayed wakes harmless: a wake that arrives
    /// late past several event boundaries emits all of them at their exact
    /// accumulated times. `on_step` fires once per audible commit with
    /// `(index, step, due_time)`.
    pub fn pass(
        &mut self,
        sink: &dyn RenderSink,
        timeline: &Timeline,
        tempo: &Tempo,
        looping: bool,
        mut on_step: impl FnMut(usize, &Step, f64),
    ) -> Pass {
        let horizon = sink.now() + self.config.schedule_ahead.as_secs_f64();
        let mut committed = 0;
        let mut degenerate_run = 0;

        while self.cursor.next_time < horizon {
            let index = self.cursor.next_index;
            let Some(step) = timeline.step_at(index) else {
                if looping {
                    self.cursor.next_index = 0;
                    continue;
                }
                return Pass::Exhausted;
            };

            let seconds = tempo.seconds_for(step.divisions);
            if !seconds.is_finite() || seconds <= 0.0 {
                // Skip the step instead of spinning forever at a frozen
                // next_time; a whole timeline of such steps is unplayable.
                log::warn!("skipping step {index}: degenerate duration {seconds}s at {tempo}");
                degenerate_run += 1;
                if degenerate_run >= timeline.len() {
                    return Pass::Exhausted;
                }
                self.cursor.next_index += 1;
                continue;
            }
            degenerate_run = 0;

            if let Some(tone) = render_command(&step.payload, self.cursor.next_time, seconds) {
                if let Err(err) = sink.schedule_tone(tone) {
                    return Pass::Fault(err);
                }
                on_step(index, step, self.cursor.next_time);
                committed += 1;
            }

            self.cursor.next_time += seconds;
            self.cursor.next_index += 1;
        }

        Pass::Scheduled { committed }
    }
}

/// Maps an audible payload to its render command; `Rest` maps to nothing.
fn render_command(payload: &Payload, start: f64, step_seconds: f64) -> Option<ToneCommand> {
    match payload {
        Payload::Click(click) => {
            let (frequency, gain) = match click {
                ClickType::Accent => ACCENT_CLICK,
                ClickType::Regular => REGULAR_CLICK,
            };
            Some(ToneCommand {
                frequency,
                start,
                duration: CLICK_SECONDS,
                gain,
            })
        }
        Payload::Tone { frequency, .. } => Some(ToneCommand {
            frequency: *frequency as f32,
            start,
            duration: step_seconds,
            gain: TONE_GAIN,
        }),
        Payload::Rest => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sink::test_support::ManualSink;

    fn tone_step(frequency: f64, divisions: f64) -> Step {
        Step::new(
            Payload::Tone {
                frequency,
                note: String::new(),
                chord: None,
            },
            divisions,
        )
    }

    fn two_note_timeline() -> Timeline {
        Timeline::from_steps(vec![tone_step(440.0, 1.0), tone_step(523.25, 1.0)]).unwrap()
    }

    #[test]
    fn test_pass_commits_window_only() {
        let sink = ManualSink::new();
        let timeline = two_note_timeline();
        let tempo = Tempo::beats(60.0).unwrap();
        let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default(), 0.05);

        // Window is now + 0.1s: only the first note (due 0.05) fits
        let pass = scheduler.pass(&sink, &timeline, &tempo, false, |_, _, _| {});
        assert_eq!(pass, Pass::Scheduled { committed: 1 });
        assert_eq!(sink.committed().len(), 1);
        assert_eq!(sink.committed()[0].start, 0.05);
        assert_eq!(sink.committed()[0].frequency, 440.0);
        assert_eq!(sink.committed()[0].duration, 1.0);

        // Same window again: nothing new
        let pass = scheduler.pass(&sink, &timeline, &tempo, false, |_, _, _| {});
        assert_eq!(pass, Pass::Scheduled { committed: 0 });
        assert_eq!(sink.committed().len(), 1);
    }

    #[test]
    fn test_delayed_wake_emits_every_missed_event() {
        let sink = ManualSink::new();
        let timeline =
            Timeline::from_steps((0..8).map(|_| tone_step(440.0, 1.0)).collect()).unwrap();
        let tempo = Tempo::beats(240.0).unwrap(); // 0.25s per beat
        let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default(), 0.0);

        // A wake delayed past three event boundaries commits all of them
        sink.advance(0.8);
        scheduler.pass(&sink, &timeline, &tempo, false, |_, _, _| {});

        let starts: Vec<f64> = sink.committed().iter().map(|t| t.start).collect();
        assert_eq!(starts, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_loop_wrap_keeps_time_monotonic() {
        let sink = ManualSink::new();
        let timeline =
            Timeline::from_steps((0..4).map(|_| tone_step(440.0, 1.0)).collect()).unwrap();
        let tempo = Tempo::beats(240.0).unwrap();
        let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default(), 0.0);

        let mut last_time = 0.0;
        let mut wrapped_indices = 0;
        for _ in 0..10 {
            let mut max_index = 0;
            let pass = scheduler.pass(&sink, &timeline, &tempo, true, |index, _, _| {
                max_index = max_index.max(index);
            });
            assert!(matches!(pass, Pass::Scheduled { .. }));

            // next_time never resets backward across passes
            assert!(scheduler.cursor().next_time >= last_time);
            assert!(scheduler.cursor().next_time > last_time || max_index == 0);
            last_time = scheduler.cursor().next_time;

            if scheduler.cursor().next_index < 4 && last_time > 1.0 {
                wrapped_indices += 1;
            }
            sink.advance(0.25);
        }
        assert!(wrapped_indices >= 2, "cursor wrapped {} times", wrapped_indices);

        // Commits form a strictly increasing arithmetic sequence through wraps
        let starts: Vec<f64> = sink.committed().iter().map(|t| t.start).collect();
        for (i, pair) in starts.windows(2).enumerate() {
            assert!(
                (pair[1] - pair[0] - 0.25).abs() < 1e-9,
                "gap at commit {}: {:?}",
                i,
                pair
            );
        }
    }

    #[test]
    fn test_exhaustion_without_loop() {
        let sink = ManualSink::new();
        let timeline =
            Timeline::from_steps((0..3).map(|_| tone_step(440.0, 1.0)).collect()).unwrap();
        let tempo = Tempo::beats(240.0).unwrap();
        let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default(), 0.0);

        // Wide-open clock: the whole timeline fits in one window
        sink.advance(10.0);
        let pass = scheduler.pass(&sink, &timeline, &tempo, false, |_, _, _| {});
        assert_eq!(pass, Pass::Exhausted);
        assert_eq!(sink.committed().len(), 3);

        // A further pass stays exhausted and commits nothing
        let pass = scheduler.pass(&sink, &timeline, &tempo, false, |_, _, _| {});
        assert_eq!(pass, Pass::Exhausted);
        assert_eq!(sink.committed().len(), 3);
    }

    #[test]
    fn test_rests_keep_time_but_stay_silent() {
        let sink = ManualSink::new();
        let timeline = Timeline::click_grid(4, 4);
        let tempo = Tempo::new(120.0, 4).unwrap(); // 0.125s per sixteenth
        let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default(), 0.0);

        sink.advance(2.0); // one full measure
        scheduler.pass(&sink, &timeline, &tempo, true, |_, _, _| {});

        // Quarters sound at 0.5s spacing even though the grid ticks sixteenths
        let starts: Vec<f64> = sink.committed().iter().map(|t| t.start).collect();
        assert_eq!(starts.len(), 5); // slots 0,4,8,12 + wrapped accent at 2.0
        for (i, start) in starts.iter().enumerate() {
            assert!((start - i as f64 * 0.5).abs() < 1e-9);
        }
        assert_eq!(sink.committed()[0].frequency, 1200.0);
        assert_eq!(sink.committed()[1].frequency, 800.0);
        assert_eq!(sink.committed()[4].frequency, 1200.0); // next measure's accent
    }

    #[test]
    fn test_degenerate_duration_skipped() {
        let sink = ManualSink::new();
        // f64::MAX divisions overflows seconds_for to +inf
        let timeline = Timeline::from_steps(vec![
            tone_step(440.0, 1.0),
            tone_step(440.0, f64::MAX),
            tone_step(523.25, 1.0),
        ])
        .unwrap();
        let tempo = Tempo::beats(240.0).unwrap();
        let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default(), 0.0);

        sink.advance(1.0);
        let pass = scheduler.pass(&sink, &timeline, &tempo, false, |_, _, _| {});
        assert_eq!(pass, Pass::Exhausted);

        // The degenerate step was skipped; its neighbors both sounded
        let starts: Vec<f64> = sink.committed().iter().map(|t| t.start).collect();
        assert_eq!(starts, vec![0.0, 0.25]);
        assert_eq!(sink.committed()[1].frequency, 523.25);
    }

    #[test]
    fn test_all_degenerate_timeline_bails_out() {
        let sink = ManualSink::new();
        let timeline = Timeline::from_steps(vec![
            tone_step(440.0, f64::MAX),
            tone_step(440.0, f64::MAX),
        ])
        .unwrap();
        let tempo = Tempo::beats(240.0).unwrap();
        let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default(), 0.0);

        sink.advance(1.0);
        // Looping + all-degenerate must terminate, not spin
        let pass = scheduler.pass(&sink, &timeline, &tempo, true, |_, _, _| {});
        assert_eq!(pass, Pass::Exhausted);
        assert!(sink.committed().is_empty());
    }

    #[test]
    fn test_sink_fault_propagates() {
        let sink = ManualSink::new();
        *sink.fail_with.lock().unwrap() = Some(RenderError::DeviceClosed);
        let timeline = two_note_timeline();
        let tempo = Tempo::beats(60.0).unwrap();
        let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default(), 0.0);

        let pass = scheduler.pass(&sink, &timeline, &tempo, false, |_, _, _| {});
        assert_eq!(pass, Pass::Fault(RenderError::DeviceClosed));
    }
}
