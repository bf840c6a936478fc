//! Running aggregates kept per note, per pattern and per difficulty

use crate::types::difficulty::DifficultyLevel;

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Outcome of one recorded pattern attempt
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttemptSample {
    pub correct: bool,
    pub time_ms: f64,
    pub timestamp_ms: f64,
}

/// Aggregate for one MIDI note across every pattern it appeared in
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoteMetric {
    pub midi: u8,
    pub attempts: u64,
    pub correct: u64,
    /// Running mean, updated in place
    pub average_time_ms: f64,
}

impl NoteMetric {
    pub fn new(midi: u8) -> Self {
        NoteMetric {
            midi,
            attempts: 0,
            correct: 0,
            average_time_ms: 0.0,
        }
    }

    pub(crate) fn record(&mut self, correct: bool, time_ms: f64) {
        self.attempts += 1;
        if correct {
            self.correct += 1;
        }
        self.average_time_ms += (time_ms - self.average_time_ms) / self.attempts as f64;
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.attempts)
    }
}

/// Aggregate for one pattern id
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternMetric {
    pub pattern_id: String,
    pub difficulty: DifficultyLevel,
    pub midi_notes: Vec<u8>,
    pub attempts: u64,
    pub correct_attempts: u64,
    pub total_time_ms: f64,
    pub best_time_ms: Option<f64>,
    pub worst_time_ms: Option<f64>,
    pub history: Vec<AttemptSample>,
}

impl PatternMetric {
    pub fn new(pattern_id: impl Into<String>, difficulty: DifficultyLevel, midi_notes: Vec<u8>) -> Self {
        PatternMetric {
            pattern_id: pattern_id.into(),
            difficulty,
            midi_notes,
            attempts: 0,
            correct_attempts: 0,
            total_time_ms: 0.0,
            best_time_ms: None,
            worst_time_ms: None,
            history: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, sample: AttemptSample) {
        self.attempts += 1;
        if sample.correct {
            self.correct_attempts += 1;
        }
        self.total_time_ms += sample.time_ms;
        self.best_time_ms = Some(self.best_time_ms.map_or(sample.time_ms, |b| b.min(sample.time_ms)));
        self.worst_time_ms = Some(self.worst_time_ms.map_or(sample.time_ms, |w| w.max(sample.time_ms)));
        self.history.push(sample);
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct_attempts, self.attempts)
    }

    /// Mean attempt time rounded to two decimals
    pub fn average_time_ms(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            round2(self.total_time_ms / self.attempts as f64)
        }
    }
}

/// Aggregate for one difficulty tier
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DifficultyMetric {
    pub difficulty: DifficultyLevel,
    pub attempts: u64,
    pub correct_attempts: u64,
    pub total_time_ms: f64,
}

impl DifficultyMetric {
    pub fn new(difficulty: DifficultyLevel) -> Self {
        DifficultyMetric {
            difficulty,
            attempts: 0,
            correct_attempts: 0,
            total_time_ms: 0.0,
        }
    }

    pub(crate) fn record(&mut self, correct: bool, time_ms: f64) {
        self.attempts += 1;
        if correct {
            self.correct_attempts += 1;
        }
        self.total_time_ms += time_ms;
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct_attempts, self.attempts)
    }

    pub fn average_time_ms(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            round2(self.total_time_ms / self.attempts as f64)
        }
    }
}
