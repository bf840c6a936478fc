pub mod difficulty;
pub mod midi_event;
pub mod note;
pub mod pattern;
pub mod time;

pub use difficulty::DifficultyLevel;
pub use midi_event::{MidiEvent, MidiEventKind};
pub use note::{Pitch, Spelling};
pub use pattern::{Pattern, PatternNote, PatternNotes};
pub use time::Beats;
