// Sequencer module - tempo math, timelines, look-ahead scheduling, playback control

pub mod player;
pub mod scheduler;
pub mod tempo;
pub mod timeline;

pub use player::{Player, PlayerError, PlayerState};
pub use scheduler::{LookaheadScheduler, Pass, ScheduleCursor, SchedulerConfig};
pub use tempo::{Tempo, TempoError};
pub use timeline::{ClickType, Payload, Step, Timeline, TimelineError};
