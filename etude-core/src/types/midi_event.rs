//! Note events from a MIDI transport

/// Kind of note event after normalisation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum MidiEventKind {
    NoteOn,
    NoteOff,
}

/// A single note event: `(note, velocity, timestamp, kind)`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MidiEvent {
    pub note: u8,
    pub velocity: u8,
    pub timestamp_ms: f64,
    pub kind: MidiEventKind,
}

impl MidiEvent {
    pub fn note_on(note: u8, velocity: u8, timestamp_ms: f64) -> Self {
        MidiEvent {
            note: note & 0x7F,
            velocity: velocity & 0x7F,
            timestamp_ms,
            kind: MidiEventKind::NoteOn,
        }
    }

    pub fn note_off(note: u8, timestamp_ms: f64) -> Self {
        MidiEvent {
            note: note & 0x7F,
            velocity: 0,
            timestamp_ms,
            kind: MidiEventKind::NoteOff,
        }
    }

    /// Parse a raw channel voice message.
    ///
    /// Status 0x9n is note on and 0x8n note off, on any channel. A note on with
    /// velocity 0 is a note off. Other messages return `None`.
    pub fn from_bytes(bytes: &[u8], timestamp_ms: f64) -> Option<Self> {
        let (&status, rest) = bytes.split_first()?;
        let (&note, rest) = rest.split_first()?;
        let velocity = rest.first().copied().unwrap_or(0);
        if note > 0x7F || velocity > 0x7F {
            return None;
        }

        match status & 0xF0 {
            0x90 if velocity > 0 => Some(MidiEvent::note_on(note, velocity, timestamp_ms)),
            0x90 | 0x80 => Some(MidiEvent::note_off(note, timestamp_ms)),
            _ => None,
        }
    }

    /// Note ons with a positive velocity are the only events that get validated
    pub fn is_playable(&self) -> bool {
        self.kind == MidiEventKind::NoteOn && self.velocity > 0
    }
}
