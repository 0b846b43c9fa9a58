// Timeline - Ordered step sequences for the scheduler
// A timeline is either a synthesized click grid (metronome) or a note list (music box)

/// Metronome click type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickType {
    /// Click on first beat of measure (accent/downbeat)
    Accent,
    /// Click on other beats
    Regular,
}

/// What a step sounds like when it fires.
///
/// Opaque to the scheduler apart from audibility; the render glue maps it to
/// a concrete tone profile.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Metronome click
    Click(ClickType),
    /// Pitched tone with display labels for the UI layer
    Tone {
        frequency: f64,
        note: String,
        chord: Option<String>,
    },
    /// Grid placeholder that keeps time but makes no sound
    Rest,
}

impl Payload {
    /// Whether this payload produces a render command when scheduled
    pub fn is_audible(&self) -> bool {
        !matches!(self, Payload::Rest)
    }
}

/// One timeline position: a payload plus its duration in grid units
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub payload: Payload,
    pub divisions: f64,
}

impl Step {
    pub fn new(payload: Payload, divisions: f64) -> Self {
        Self { payload, divisions }
    }
}

/// Timeline validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimelineError {
    #[error("timeline has no steps")]
    Empty,

    #[error("step {index} has non-positive duration ({divisions} grid units)")]
    InvalidDuration { index: usize, divisions: f64 },

    #[error("step {index} has an unplayable frequency ({frequency} Hz)")]
    InvalidFrequency { index: usize, frequency: f64 },
}

/// An ordered sequence of steps.
///
/// Immutable during a playback run; the scheduler walks it by index and the
/// session decides whether the end wraps (loop) or exhausts.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    steps: Vec<Step>,
}

impl Timeline {
    /// Builds a timeline from explicit steps, validating each duration.
    pub fn from_steps(steps: Vec<Step>) -> Result<Self, TimelineError> {
        if steps.is_empty() {
            return Err(TimelineError::Empty);
        }
        for (index, step) in steps.iter().enumerate() {
            if !(step.divisions > 0.0) {
                return Err(TimelineError::InvalidDuration {
                    index,
                    divisions: step.divisions,
                });
            }
            if let Payload::Tone { frequency, .. } = step.payload {
                if !frequency.is_finite() || frequency <= 0.0 {
                    return Err(TimelineError::InvalidFrequency { index, frequency });
                }
            }
        }
        Ok(Self { steps })
    }

    /// One measure of the metronome grid.
    ///
    /// `beats_per_measure * subdivisions_per_beat` slots of one grid unit
    /// each. Only slots on a beat boundary carry a click (accent on slot 0);
    /// the slots between stay silent so the grid can later carry sub-beat
    /// weights without restructuring.
    pub fn click_grid(beats_per_measure: u32, subdivisions_per_beat: u32) -> Self {
        assert!(beats_per_measure > 0, "measure must have at least one beat");
        assert!(
            subdivisions_per_beat > 0,
            "beat must have at least one subdivision"
        );

        let slots = beats_per_measure * subdivisions_per_beat;
        let steps = (0..slots)
            .map(|slot| {
                let payload = if slot % subdivisions_per_beat == 0 {
                    if slot == 0 {
                        Payload::Click(ClickType::Accent)
                    } else {
                        Payload::Click(ClickType::Regular)
                    }
                } else {
                    Payload::Rest
                };
                Step::new(payload, 1.0)
            })
            .collect();

        Self { steps }
    }

    /// Resolve the step at `index`; `None` means the end of a finite run.
    pub fn step_at(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Total length in grid units
    pub fn total_divisions(&self) -> f64 {
        self.steps.iter().map(|s| s.divisions).sum()
    }
}
