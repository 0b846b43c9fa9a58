// Song data - note lists and arpeggio presets for the music box front-end

use crate::library::notes::note_frequency;
use crate::sequencer::timeline::{Payload, Step, Timeline, TimelineError};

/// Song construction errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SongError {
    #[error("unknown note name: {0}")]
    UnknownNote(String),
}

/// One note of a song: name, resolved frequency, duration in beats, and an
/// optional chord label shown while it sounds.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NoteStep {
    pub note: String,
    pub frequency: f64,
    pub beats: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chord: Option<String>,
}

impl NoteStep {
    /// Builds a step from a note name in the table
    pub fn named(note: &str, beats: f64) -> Result<Self, SongError> {
        let frequency =
            note_frequency(note).ok_or_else(|| SongError::UnknownNote(note.to_string()))?;
        Ok(Self {
            note: note.to_string(),
            frequency,
            beats,
            chord: None,
        })
    }

    pub fn with_chord(mut self, chord: &str) -> Self {
        self.chord = Some(chord.to_string());
        self
    }
}

/// A chord reduced to the three tones the arpeggio pattern cycles through
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChordTones {
    pub name: String,
    pub root: String,
    pub third: String,
    pub fifth: String,
}

impl ChordTones {
    pub fn new(name: &str, root: &str, third: &str, fifth: &str) -> Self {
        Self {
            name: name.to_string(),
            root: root.to_string(),
            third: third.to_string(),
            fifth: fifth.to_string(),
        }
    }
}

/// A playable song: ordered notes plus the tempo it is meant for.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Song {
    pub key: String,
    pub name: String,
    pub recommended_bpm: f64,
    pub notes: Vec<NoteStep>,
}

impl Song {
    /// Expands a chord progression into an arpeggio song: each chord becomes
    /// root-third-fifth-third-root-third-fifth-third at half a beat per tone.
    pub fn from_progression(
        key: &str,
        name: &str,
        recommended_bpm: f64,
        progression: &[ChordTones],
    ) -> Result<Self, SongError> {
        let mut notes = Vec::with_capacity(progression.len() * 8);

        for chord in progression {
            let pattern = [
                &chord.root,
                &chord.third,
                &chord.fifth,
                &chord.third,
                &chord.root,
                &chord.third,
                &chord.fifth,
                &chord.third,
            ];
            for note in pattern {
                notes.push(NoteStep::named(note, 0.5)?.with_chord(&chord.name));
            }
        }

        Ok(Self {
            key: key.to_string(),
            name: name.to_string(),
            recommended_bpm,
            notes,
        })
    }

    /// The song as a schedulable timeline (grid unit: one beat)
    pub fn to_timeline(&self) -> Result<Timeline, TimelineError> {
        let steps = self
            .notes
            .iter()
            .map(|step| {
                Step::new(
                    Payload::Tone {
                        frequency: step.frequency,
                        note: step.note.clone(),
                        chord: step.chord.clone(),
                    },
                    step.beats,
                )
            })
            .collect();
        Timeline::from_steps(steps)
    }
}

// Shorthand for the builtin tables; every name below is in the note table.
fn n(note: &str, beats: f64) -> NoteStep {
    NoteStep::named(note, beats).unwrap_or_else(|err| panic!("builtin song data: {err}"))
}

/// The bundled songs and arpeggio presets, songs first
pub fn builtin_songs() -> Vec<Song> {
    let mut songs = vec![
        Song {
            key: "twinkle".to_string(),
            name: "Twinkle".to_string(),
            recommended_bpm: 84.0,
            notes: vec![
                n("C4", 1.0),
                n("C4", 1.0),
                n("G4", 1.0),
                n("G4", 1.0),
                n("A4", 1.0),
                n("A4", 1.0),
                n("G4", 2.0),
                n("F4", 1.0),
                n("F4", 1.0),
                n("E4", 1.0),
                n("E4", 1.0),
                n("D4", 1.0),
                n("D4", 1.0),
                n("C4", 2.0),
            ],
        },
        Song {
            key: "ode".to_string(),
            name: "Ode to Joy".to_string(),
            recommended_bpm: 96.0,
            notes: vec![
                n("E4", 1.0),
                n("E4", 1.0),
                n("F4", 1.0),
                n("G4", 1.0),
                n("G4", 1.0),
                n("F4", 1.0),
                n("E4", 1.0),
                n("D4", 1.0),
                n("C4", 1.0),
                n("C4", 1.0),
                n("D4", 1.0),
                n("E4", 1.0),
                n("E4", 1.5),
                n("D4", 0.5),
                n("D4", 2.0),
            ],
        },
        Song {
            key: "canon".to_string(),
            name: "Canon Loop".to_string(),
            recommended_bpm: 76.0,
            notes: vec![
                n("D4", 1.0),
                n("A3", 1.0),
                n("B3", 1.0),
                n("F#3", 1.0),
                n("G3", 1.0),
                n("D3", 1.0),
                n("G3", 1.0),
                n("A3", 1.0),
            ],
        },
    ];

    let presets = [
        Song::from_progression(
            "arp-pop-cgamf",
            "Arp: C-G-Am-F",
            96.0,
            &[
                ChordTones::new("C", "C3", "E3", "G3"),
                ChordTones::new("G", "G2", "B2", "D3"),
                ChordTones::new("Am", "A2", "C3", "E3"),
                ChordTones::new("F", "F2", "A2", "C3"),
            ],
        ),
        Song::from_progression(
            "arp-jazz-251-c",
            "Arp: Dm7-G7-Cmaj7",
            110.0,
            &[
                ChordTones::new("Dm", "D3", "F3", "A3"),
                ChordTones::new("G", "G2", "B2", "D3"),
                ChordTones::new("C", "C3", "E3", "G3"),
                ChordTones::new("C", "C3", "E3", "G3"),
            ],
        ),
    ];
    for preset in presets {
        match preset {
            Ok(song) => songs.push(song),
            Err(err) => panic!("builtin preset data: {err}"),
        }
    }

    songs
}

/// Find a bundled song by its key
pub fn song_by_key(key: &str) -> Option<Song> {
    builtin_songs().into_iter().find(|song| song.key == key)
}
