//! Practice pattern data model
//!
//! A [`Pattern`] is immutable once built. The number of notes is carried by
//! the [`PatternNotes`] variant itself, so a triad can never hold two notes.

use crate::error::GenerationError;
use crate::notation;
use crate::types::difficulty::DifficultyLevel;
use crate::types::note::{midi_name, MIDDLE_C, MIDI_MAX};
#[cfg(feature = "colored")]
use crate::types::note::is_natural_pitch_class;
use crate::types::time::{beats, is_non_negative, is_positive, Beats};
#[cfg(feature = "colored")]
use colored::*;
use std::collections::BTreeSet;
use std::fmt;

/// One note of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternNote {
    midi: u8,
    duration: Beats,
    start_offset: Beats,
}

impl PatternNote {
    /// Create a note, rejecting MIDI numbers above 127, non-positive durations
    /// and negative offsets.
    pub fn new(midi: u8, duration: Beats, start_offset: Beats) -> Result<Self, GenerationError> {
        if midi > MIDI_MAX {
            return Err(GenerationError::InvalidNote(format!(
                "MIDI note {} is above {}",
                midi, MIDI_MAX
            )));
        }
        if !is_positive(duration) {
            return Err(GenerationError::InvalidNote(format!(
                "duration {} must be positive",
                duration
            )));
        }
        if !is_non_negative(start_offset) {
            return Err(GenerationError::InvalidNote(format!(
                "start offset {} must not be negative",
                start_offset
            )));
        }
        Ok(PatternNote {
            midi,
            duration,
            start_offset,
        })
    }

    /// A quarter note starting `offset` whole beats into the pattern
    pub fn quarter(midi: u8, offset: i64) -> Result<Self, GenerationError> {
        Self::new(midi, beats(1), beats(offset))
    }

    pub fn midi(&self) -> u8 {
        self.midi
    }

    pub fn duration(&self) -> Beats {
        self.duration
    }

    pub fn start_offset(&self) -> Beats {
        self.start_offset
    }
}

/// Notes of a pattern, sized by difficulty
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "notes", rename_all = "kebab-case"))]
pub enum PatternNotes {
    SingleNote([PatternNote; 1]),
    Interval([PatternNote; 2]),
    Triad([PatternNote; 3]),
}

impl PatternNotes {
    /// Build the variant matching `difficulty` from a list of notes
    pub fn from_notes(
        difficulty: DifficultyLevel,
        notes: Vec<PatternNote>,
    ) -> Result<Self, GenerationError> {
        let wrong_count = |actual: usize| GenerationError::WrongNoteCount {
            expected: difficulty.note_count(),
            actual,
        };
        let actual = notes.len();
        match difficulty {
            DifficultyLevel::SingleNote => <[PatternNote; 1]>::try_from(notes)
                .map(PatternNotes::SingleNote)
                .map_err(|_| wrong_count(actual)),
            DifficultyLevel::Interval => <[PatternNote; 2]>::try_from(notes)
                .map(PatternNotes::Interval)
                .map_err(|_| wrong_count(actual)),
            DifficultyLevel::Triad => <[PatternNote; 3]>::try_from(notes)
                .map(PatternNotes::Triad)
                .map_err(|_| wrong_count(actual)),
        }
    }

    pub fn difficulty(&self) -> DifficultyLevel {
        match self {
            PatternNotes::SingleNote(_) => DifficultyLevel::SingleNote,
            PatternNotes::Interval(_) => DifficultyLevel::Interval,
            PatternNotes::Triad(_) => DifficultyLevel::Triad,
        }
    }

    pub fn as_slice(&self) -> &[PatternNote] {
        match self {
            PatternNotes::SingleNote(notes) => notes,
            PatternNotes::Interval(notes) => notes,
            PatternNotes::Triad(notes) => notes,
        }
    }

    /// MIDI numbers in pattern order
    pub fn midi_notes(&self) -> Vec<u8> {
        self.as_slice().iter().map(|n| n.midi()).collect()
    }
}

/// A short musical challenge presented to the learner
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pattern {
    id: String,
    notes: PatternNotes,
    notation: String,
    created_at_ms: f64,
}

impl Pattern {
    /// Build a pattern and render its notation payload
    pub fn new(id: impl Into<String>, notes: PatternNotes, created_at_ms: f64) -> Self {
        let notation = notation::render(&notes);
        Pattern {
            id: id.into(),
            notes,
            notation,
            created_at_ms,
        }
    }

    /// Canonical pattern rooted at middle C: `C4`, `C4 G4` or `C4 E4 G4`,
    /// shaped like the regular patterns of `difficulty`.
    pub fn fallback(difficulty: DifficultyLevel, id: impl Into<String>, created_at_ms: f64) -> Self {
        let notes = match difficulty {
            DifficultyLevel::SingleNote => {
                PatternNotes::SingleNote([fallback_note(MIDDLE_C, 0)])
            }
            DifficultyLevel::Interval => PatternNotes::Interval([
                fallback_note(MIDDLE_C, 0),
                fallback_note(MIDDLE_C + 7, 1),
            ]),
            DifficultyLevel::Triad => PatternNotes::Triad([
                fallback_note(MIDDLE_C, 0),
                fallback_note(MIDDLE_C + 4, 0),
                fallback_note(MIDDLE_C + 7, 0),
            ]),
        };
        Pattern::new(id, notes, created_at_ms)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn difficulty(&self) -> DifficultyLevel {
        self.notes.difficulty()
    }

    pub fn notes(&self) -> &[PatternNote] {
        self.notes.as_slice()
    }

    pub fn pattern_notes(&self) -> &PatternNotes {
        &self.notes
    }

    pub fn midi_notes(&self) -> Vec<u8> {
        self.notes.midi_notes()
    }

    /// The set of MIDI numbers a learner must play to complete this pattern
    pub fn expected_set(&self) -> BTreeSet<u8> {
        self.notes().iter().map(|n| n.midi()).collect()
    }

    /// Serialized MusicXML document for the notation collaborator
    pub fn notation(&self) -> &str {
        &self.notation
    }

    pub fn created_at_ms(&self) -> f64 {
        self.created_at_ms
    }

    /// Content key shared by every pattern with the same difficulty and notes,
    /// e.g. `interval:60-67`
    pub fn signature(&self) -> String {
        let midi: Vec<String> = self.midi_notes().iter().map(|m| m.to_string()).collect();
        format!("{}:{}", self.difficulty().name(), midi.join("-"))
    }
}

// Middle C and its fifth/third are always valid quarter notes.
fn fallback_note(midi: u8, offset: i64) -> PatternNote {
    PatternNote {
        midi,
        duration: beats(1),
        start_offset: beats(offset),
    }
}

impl Pattern {
    /// Display form with naturals in cyan and accidentals in magenta
    #[cfg(feature = "colored")]
    pub fn to_colored_string(&self) -> String {
        let names: Vec<String> = self
            .midi_notes()
            .into_iter()
            .map(|midi| {
                let name = midi_name(midi);
                if is_natural_pitch_class(midi % 12) {
                    name.cyan().to_string()
                } else {
                    name.magenta().bold().to_string()
                }
            })
            .collect();
        format!(
            "{}: [{}]",
            self.difficulty().label().bold(),
            names.join(", ")
        )
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.midi_notes().into_iter().map(midi_name).collect();
        write!(f, "{}: [{}]", self.difficulty().label(), names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::time::beats_ratio;

    #[test]
    fn test_pattern_note_validation() {
        assert!(PatternNote::new(60, beats(1), beats(0)).is_ok());
        assert!(PatternNote::new(128, beats(1), beats(0)).is_err());
        assert!(PatternNote::new(60, beats(0), beats(0)).is_err());
        assert!(PatternNote::new(60, beats(1), beats_ratio(-1, 2)).is_err());
    }

    #[test]
    fn test_from_notes_enforces_count() {
        let notes = vec![
            PatternNote::quarter(60, 0).unwrap(),
            PatternNote::quarter(64, 0).unwrap(),
        ];
        let interval = PatternNotes::from_notes(DifficultyLevel::Interval, notes.clone()).unwrap();
        assert_eq!(interval.difficulty(), DifficultyLevel::Interval);

        let err = PatternNotes::from_notes(DifficultyLevel::Triad, notes).unwrap_err();
        assert_eq!(
            err,
            GenerationError::WrongNoteCount {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_fallback_shapes() {
        for level in DifficultyLevel::ALL {
            let pattern = Pattern::fallback(level, "fallback", 0.0);
            assert_eq!(pattern.difficulty(), level);
            assert_eq!(pattern.notes().len(), level.note_count());
            assert_eq!(pattern.notes()[0].midi(), MIDDLE_C);
        }
        let triad = Pattern::fallback(DifficultyLevel::Triad, "t", 0.0);
        assert_eq!(triad.midi_notes(), vec![60, 64, 67]);
    }

    #[test]
    fn test_signature_and_display() {
        let pattern = Pattern::fallback(DifficultyLevel::Interval, "p-1", 0.0);
        assert_eq!(pattern.signature(), "interval:60-67");
        assert_eq!(pattern.to_string(), "Intervals: [C4, G4]");
    }

    #[test]
    fn test_expected_set() {
        let pattern = Pattern::fallback(DifficultyLevel::Triad, "p-2", 0.0);
        let expected: Vec<u8> = pattern.expected_set().into_iter().collect();
        assert_eq!(expected, vec![60, 64, 67]);
    }
}
