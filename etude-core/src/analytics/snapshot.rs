//! Export / import of analytics state

use super::metrics::{DifficultyMetric, NoteMetric, PatternMetric};
use crate::error::{EngineError, EngineResult};
use crate::types::difficulty::DifficultyLevel;
use crate::types::note::MIDI_MAX;
use std::collections::HashSet;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Complete analytics state in a stable, sorted form
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalyticsSnapshot {
    pub version: u32,
    pub patterns: Vec<PatternMetric>,
    pub notes: Vec<NoteMetric>,
    pub difficulties: Vec<DifficultyMetric>,
    pub recent_outcomes: Vec<bool>,
}

impl AnalyticsSnapshot {
    /// Check internal consistency before the snapshot replaces live state
    pub fn validate(&self) -> EngineResult<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(EngineError::Snapshot(format!(
                "unsupported snapshot version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }

        let mut ids = HashSet::new();
        for pattern in &self.patterns {
            if !ids.insert(pattern.pattern_id.as_str()) {
                return Err(EngineError::Snapshot(format!(
                    "duplicate pattern id {}",
                    pattern.pattern_id
                )));
            }
            if pattern.correct_attempts > pattern.attempts
                || pattern.history.len() as u64 != pattern.attempts
            {
                return Err(EngineError::Snapshot(format!(
                    "inconsistent counts for pattern {}",
                    pattern.pattern_id
                )));
            }
            if pattern.midi_notes.iter().any(|&m| m > MIDI_MAX) {
                return Err(EngineError::Snapshot(format!(
                    "pattern {} holds a note above {}",
                    pattern.pattern_id, MIDI_MAX
                )));
            }
        }

        let mut midi = HashSet::new();
        for note in &self.notes {
            if note.midi > MIDI_MAX || !midi.insert(note.midi) {
                return Err(EngineError::Snapshot(format!(
                    "invalid or duplicate note metric {}",
                    note.midi
                )));
            }
            if note.correct > note.attempts {
                return Err(EngineError::Snapshot(format!(
                    "inconsistent counts for note {}",
                    note.midi
                )));
            }
        }

        let mut levels: HashSet<DifficultyLevel> = HashSet::new();
        for metric in &self.difficulties {
            if !levels.insert(metric.difficulty) || metric.correct_attempts > metric.attempts {
                return Err(EngineError::Snapshot(format!(
                    "invalid difficulty metric for {}",
                    metric.difficulty
                )));
            }
        }

        Ok(())
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string(self).map_err(|e| EngineError::Snapshot(e.to_string()))
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let snapshot: AnalyticsSnapshot =
            serde_json::from_str(json).map_err(|e| EngineError::Snapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
