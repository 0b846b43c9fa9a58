// Pulsebox - look-ahead audio event scheduling for metronome and music box playback

pub mod audio;
pub mod library;
pub mod messaging;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use audio::engine::{CpalHandle, CpalSink};
pub use audio::sink::{RenderError, RenderSink, ToneCommand};
pub use library::songs::{Song, builtin_songs, song_by_key};
pub use messaging::channels::{create_command_channel, create_update_channel};
pub use messaging::update::{PlaybackUpdate, StopReason};
pub use sequencer::{
    ClickType, LookaheadScheduler, Pass, Payload, Player, PlayerError, PlayerState,
    SchedulerConfig, Step, Tempo, TempoError, Timeline, TimelineError,
};
