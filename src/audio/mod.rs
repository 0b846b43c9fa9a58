// Audio module - render sink boundary and its CPAL implementation

pub mod engine;
pub mod parameters;
pub mod sink;
pub mod timing;
pub mod voice;

pub use engine::{CpalHandle, CpalSink};
pub use sink::{RenderError, RenderSink, SinkCommand, ToneCommand};
pub use timing::AudioClock;
