// Library module - bundled note table, songs, and arpeggio presets

pub mod notes;
pub mod songs;

pub use notes::{NOTE_FREQUENCIES, note_frequency};
pub use songs::{ChordTones, NoteStep, Song, SongError, builtin_songs, song_by_key};
