use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;

/// Highest valid MIDI note number
pub const MIDI_MAX: u8 = 127;

/// MIDI note 60 = Middle C (C4 in scientific pitch notation)
pub const MIDDLE_C: u8 = 60;

/// A pitch addressed by MIDI note number, with a spelling preference for display
/// and notation output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pitch {
    midi: u8,
    spelling: Spelling,
}

/// How a black key is spelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Spelling {
    /// Key-of-C spelling: C#, Eb, F#, Ab, Bb
    Conventional,
    Sharp,
    Flat,
}

/// Standard 12-tone equal temperament frequencies for the 4th octave (C4-B4)
/// Based on A4 = 440Hz standard tuning
const BASE_OCTAVE_FREQUENCIES: [f32; 12] = [
    261.63, // C4
    277.18, // C#4/Db4
    293.66, // D4
    311.13, // D#4/Eb4
    329.63, // E4
    349.23, // F4
    369.99, // F#4/Gb4
    392.00, // G4
    415.30, // G#4/Ab4
    440.00, // A4
    466.16, // A#4/Bb4
    493.88, // B4
];

impl Pitch {
    /// Create a pitch from a MIDI note number (0-127)
    pub fn from_midi(midi: u8) -> Result<Self> {
        if midi > MIDI_MAX {
            return Err(anyhow!("MIDI note must be 0-127, got {}", midi));
        }
        Ok(Pitch {
            midi,
            spelling: Spelling::Conventional,
        })
    }

    /// Create a pitch from chromatic pitch class (0-11) and octave
    pub fn from_parts(pitch_class: u8, octave: i8) -> Result<Self> {
        if pitch_class > 11 {
            return Err(anyhow!("Pitch class must be 0-11, got {}", pitch_class));
        }
        let midi = (octave as i16 + 1) * 12 + pitch_class as i16;
        if !(0..=MIDI_MAX as i16).contains(&midi) {
            return Err(anyhow!(
                "Pitch {} in octave {} is outside the MIDI range",
                pitch_class,
                octave
            ));
        }
        Self::from_midi(midi as u8)
    }

    pub fn with_spelling(mut self, spelling: Spelling) -> Self {
        self.spelling = spelling;
        self
    }

    pub fn midi(&self) -> u8 {
        self.midi
    }

    /// Chromatic pitch class (0=C .. 11=B)
    pub fn pitch_class(&self) -> u8 {
        self.midi % 12
    }

    /// Scientific octave number (middle C is octave 4)
    pub fn octave(&self) -> i8 {
        (self.midi / 12) as i8 - 1
    }

    pub fn is_natural(&self) -> bool {
        is_natural_pitch_class(self.pitch_class())
    }

    /// Letter name and chromatic alteration (-1, 0, +1) for notation
    pub fn step_and_alter(&self) -> (char, i8) {
        let pc = self.pitch_class();
        if is_natural_pitch_class(pc) {
            return (natural_letter(pc), 0);
        }
        let use_flat = match self.spelling {
            Spelling::Sharp => false,
            Spelling::Flat => true,
            Spelling::Conventional => matches!(pc, 3 | 8 | 10),
        };
        if use_flat {
            (natural_letter(pc + 1), -1)
        } else {
            (natural_letter(pc - 1), 1)
        }
    }

    /// Get the frequency for this pitch in Hz
    pub fn frequency(&self) -> f32 {
        let base_freq = BASE_OCTAVE_FREQUENCIES[self.pitch_class() as usize];
        let octave_diff = self.octave() as i32 - 4;
        base_freq * 2.0_f32.powi(octave_diff)
    }

    /// Transpose by semitones; `None` when the result leaves the MIDI range
    pub fn transpose(self, semitones: i16) -> Option<Pitch> {
        let target = self.midi as i16 + semitones;
        if (0..=MIDI_MAX as i16).contains(&target) {
            Some(Pitch {
                midi: target as u8,
                spelling: self.spelling,
            })
        } else {
            None
        }
    }
}

/// Check if a pitch class corresponds to a natural note (white key)
pub fn is_natural_pitch_class(pitch_class: u8) -> bool {
    matches!(pitch_class % 12, 0 | 2 | 4 | 5 | 7 | 9 | 11)
}

fn natural_letter(pitch_class: u8) -> char {
    match pitch_class % 12 {
        0 => 'C',
        2 => 'D',
        4 => 'E',
        5 => 'F',
        7 => 'G',
        9 => 'A',
        11 => 'B',
        _ => '?',
    }
}

/// Convert a loosely typed number (e.g. from JavaScript) into a MIDI note.
///
/// NaN, infinities, fractional values and anything outside 0-127 yield `None`.
pub fn midi_from_f64(value: f64) -> Option<u8> {
    if !value.is_finite() || value.fract() != 0.0 || !(0.0..=MIDI_MAX as f64).contains(&value) {
        return None;
    }
    Some(value as u8)
}

/// Display name for a MIDI number, e.g. `60 -> "C4"`
pub fn midi_name(midi: u8) -> String {
    match Pitch::from_midi(midi) {
        Ok(pitch) => pitch.to_string(),
        Err(_) => format!("#{}", midi),
    }
}

impl FromStr for Pitch {
    type Err = anyhow::Error;

    /// Parses names such as `C`, `F#4`, `Bb3`, `G-1`. Octave defaults to 4.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars
            .next()
            .ok_or_else(|| anyhow!("Empty note name"))?
            .to_ascii_uppercase();

        let natural_pc: u8 = match letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(anyhow!("Invalid note name: {}", s)),
        };

        let rest = &s[letter.len_utf8()..];
        let (alter, spelling, octave_part) = match rest.chars().next() {
            Some('#') | Some('s') | Some('S') => (1i16, Spelling::Sharp, &rest[1..]),
            Some('b') => (-1i16, Spelling::Flat, &rest[1..]),
            _ => (0i16, Spelling::Conventional, rest),
        };

        let octave = if octave_part.is_empty() {
            4
        } else {
            octave_part
                .parse::<i8>()
                .map_err(|_| anyhow!("Invalid octave: {}", octave_part))?
        };

        let midi = (octave as i16 + 1) * 12 + natural_pc as i16 + alter;
        if !(0..=MIDI_MAX as i16).contains(&midi) {
            return Err(anyhow!("Note {} is outside the MIDI range", s));
        }
        Ok(Pitch::from_midi(midi as u8)?.with_spelling(spelling))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (step, alter) = self.step_and_alter();
        let accidental = match alter {
            1 => "#",
            -1 => "b",
            _ => "",
        };
        write!(f, "{}{}{}", step, accidental, self.octave())
    }
}
