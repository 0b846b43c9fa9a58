// Messaging - channels and update types between worker, audio callback, and UI

pub mod channels;
pub mod update;

pub use channels::{create_command_channel, create_update_channel};
pub use update::{PlaybackUpdate, StopReason};
