//! Note-by-note validation against the active pattern
//!
//! Per pattern, the validator tracks which expected notes have been played and
//! whether a wrong note was struck. One wrong note poisons the attempt: every
//! later note is incorrect until the pattern is reset or retried. Session-wide
//! accuracy and streak bookkeeping lives in [`SessionTally`] and survives
//! pattern transitions.

use crate::adaptive::PerformanceMetrics;
use crate::types::note::MIDI_MAX;
use crate::types::pattern::Pattern;
use std::collections::BTreeSet;

/// Verdict for one incoming note
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationResult {
    pub correct: bool,
    pub pattern_complete: bool,
    pub response_time_ms: f64,
}

impl ValidationResult {
    /// Result for malformed input: incorrect, incomplete, no timing
    pub fn rejected() -> Self {
        ValidationResult {
            correct: false,
            pattern_complete: false,
            response_time_ms: 0.0,
        }
    }
}

/// Where the active pattern attempt stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum PatternOutcome {
    Pending,
    Completed,
    Failed,
}

/// Per-pattern validation state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationState {
    played_correct: BTreeSet<u8>,
    wrong_note: bool,
    attempts: u32,
    pattern_start_ms: f64,
}

impl ValidationState {
    fn started_at(pattern_start_ms: f64) -> Self {
        ValidationState {
            pattern_start_ms,
            ..ValidationState::default()
        }
    }

    pub fn played_correct(&self) -> &BTreeSet<u8> {
        &self.played_correct
    }

    pub fn is_poisoned(&self) -> bool {
        self.wrong_note
    }

    /// Notes received for the active pattern
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn pattern_start_ms(&self) -> f64 {
        self.pattern_start_ms
    }
}

/// Running note-level statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionTally {
    pub total_notes: u64,
    pub correct_notes: u64,
    pub streak: u32,
    pub best_streak: u32,
    pub total_response_ms: f64,
}

impl SessionTally {
    fn record(&mut self, correct: bool, response_time_ms: f64) {
        self.total_notes += 1;
        self.total_response_ms += response_time_ms;
        if correct {
            self.correct_notes += 1;
            self.streak += 1;
            self.best_streak = self.best_streak.max(self.streak);
        } else {
            self.streak = 0;
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.total_notes == 0 {
            0.0
        } else {
            self.correct_notes as f64 / self.total_notes as f64
        }
    }

    pub fn average_response_ms(&self) -> f64 {
        if self.total_notes == 0 {
            0.0
        } else {
            self.total_response_ms / self.total_notes as f64
        }
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        PerformanceMetrics {
            total_notes: self.total_notes,
            accuracy: self.accuracy(),
            average_response_ms: self.average_response_ms(),
            streak: self.streak,
        }
    }
}

/// Validation state machine for the active pattern
#[derive(Debug, Clone, Default)]
pub struct Validator {
    expected: BTreeSet<u8>,
    state: ValidationState,
    session: SessionTally,
    /// Tally since the last difficulty change, fed to the difficulty controller
    level: SessionTally,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `pattern` the active pattern and stamp its start time
    pub fn reset_for_new_pattern(&mut self, pattern: &Pattern, now_ms: f64) {
        self.expected = pattern.expected_set();
        self.state = ValidationState::started_at(now_ms);
    }

    /// Restart the active pattern from scratch
    pub fn retry(&mut self, now_ms: f64) {
        self.state = ValidationState::started_at(now_ms);
    }

    /// Forget the active pattern and all session statistics
    pub fn reset_session(&mut self) {
        *self = Validator::default();
    }

    /// Start a fresh tally for the difficulty controller
    pub fn reset_level_tally(&mut self) {
        self.level = SessionTally::default();
    }

    pub fn validate(&mut self, midi_note: Option<u8>, timestamp_ms: f64) -> ValidationResult {
        let note = match midi_note {
            Some(note) if note <= MIDI_MAX => note,
            _ => return ValidationResult::rejected(),
        };
        if !timestamp_ms.is_finite() {
            return ValidationResult::rejected();
        }
        if self.expected.is_empty() {
            tracing::debug!("Note {} received with no active pattern", note);
            return ValidationResult::rejected();
        }

        self.state.attempts += 1;
        let correct = !self.state.wrong_note
            && self.expected.contains(&note)
            && !self.state.played_correct.contains(&note);

        if correct {
            self.state.played_correct.insert(note);
        } else {
            self.state.wrong_note = true;
        }

        let response_time_ms = timestamp_ms - self.state.pattern_start_ms;
        self.session.record(correct, response_time_ms);
        self.level.record(correct, response_time_ms);

        ValidationResult {
            correct,
            pattern_complete: self.outcome() == PatternOutcome::Completed,
            response_time_ms,
        }
    }

    pub fn outcome(&self) -> PatternOutcome {
        if self.state.wrong_note {
            PatternOutcome::Failed
        } else if !self.expected.is_empty() && self.state.played_correct == self.expected {
            PatternOutcome::Completed
        } else {
            PatternOutcome::Pending
        }
    }

    pub fn has_active_pattern(&self) -> bool {
        !self.expected.is_empty()
    }

    pub fn state(&self) -> &ValidationState {
        &self.state
    }

    pub fn session(&self) -> &SessionTally {
        &self.session
    }

    pub fn level_metrics(&self) -> PerformanceMetrics {
        self.level.metrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::difficulty::DifficultyLevel;
    use crate::types::pattern::{PatternNote, PatternNotes};

    fn interval(a: u8, b: u8) -> Pattern {
        let notes = PatternNotes::Interval([
            PatternNote::quarter(a, 0).unwrap(),
            PatternNote::quarter(b, 1).unwrap(),
        ]);
        Pattern::new("test", notes, 0.0)
    }

    #[test]
    fn test_single_note_completion() {
        let mut validator = Validator::new();
        validator.reset_for_new_pattern(&Pattern::fallback(DifficultyLevel::SingleNote, "c", 0.0), 1000.0);
        let result = validator.validate(Some(60), 1350.0);
        assert!(result.correct);
        assert!(result.pattern_complete);
        assert_eq!(result.response_time_ms, 350.0);
        assert_eq!(validator.outcome(), PatternOutcome::Completed);
    }

    #[test]
    fn test_wrong_note_poisons_pattern() {
        let mut validator = Validator::new();
        validator.reset_for_new_pattern(&interval(60, 64), 0.0);

        let first = validator.validate(Some(60), 100.0);
        assert!(first.correct);
        assert!(!first.pattern_complete);

        let wrong = validator.validate(Some(61), 200.0);
        assert!(!wrong.correct);

        let late = validator.validate(Some(64), 300.0);
        assert!(!late.correct);
        assert!(!late.pattern_complete);
        assert_eq!(validator.outcome(), PatternOutcome::Failed);
        assert_eq!(validator.state().attempts(), 3);
    }

    #[test]
    fn test_repeated_note_is_wrong() {
        let mut validator = Validator::new();
        validator.reset_for_new_pattern(&interval(60, 64), 0.0);
        assert!(validator.validate(Some(60), 10.0).correct);
        assert!(!validator.validate(Some(60), 20.0).correct);
        assert!(validator.state().is_poisoned());
    }

    #[test]
    fn test_chord_in_any_order() {
        let mut validator = Validator::new();
        validator.reset_for_new_pattern(&Pattern::fallback(DifficultyLevel::Triad, "t", 0.0), 0.0);
        assert!(!validator.validate(Some(67), 10.0).pattern_complete);
        assert!(!validator.validate(Some(60), 12.0).pattern_complete);
        let last = validator.validate(Some(64), 15.0);
        assert!(last.correct && last.pattern_complete);
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        let mut validator = Validator::new();
        validator.reset_for_new_pattern(&Pattern::fallback(DifficultyLevel::SingleNote, "c", 0.0), 0.0);
        assert_eq!(validator.validate(None, 10.0), ValidationResult::rejected());
        assert_eq!(validator.validate(Some(200), 10.0), ValidationResult::rejected());
        assert_eq!(validator.validate(Some(60), f64::NAN), ValidationResult::rejected());
        // Nothing above touched the pattern
        assert_eq!(validator.outcome(), PatternOutcome::Pending);
        assert_eq!(validator.session().total_notes, 0);
        assert!(validator.validate(Some(60), 10.0).pattern_complete);
    }

    #[test]
    fn test_no_active_pattern() {
        let mut validator = Validator::new();
        assert_eq!(validator.validate(Some(60), 0.0), ValidationResult::rejected());
    }

    #[test]
    fn test_streak_bookkeeping_spans_patterns() {
        let mut validator = Validator::new();
        let single = Pattern::fallback(DifficultyLevel::SingleNote, "c", 0.0);
        for i in 0..4 {
            validator.reset_for_new_pattern(&single, i as f64 * 1000.0);
            validator.validate(Some(60), i as f64 * 1000.0 + 100.0);
        }
        assert_eq!(validator.session().streak, 4);

        validator.reset_for_new_pattern(&single, 5000.0);
        validator.validate(Some(62), 5100.0);
        let tally = validator.session();
        assert_eq!(tally.streak, 0);
        assert_eq!(tally.best_streak, 4);
        assert_eq!(tally.total_notes, 5);
        assert!((tally.accuracy() - 0.8).abs() < 1e-9);
        assert!((tally.average_response_ms() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_retry_clears_poison() {
        let mut validator = Validator::new();
        validator.reset_for_new_pattern(&interval(60, 64), 0.0);
        validator.validate(Some(62), 50.0);
        assert_eq!(validator.outcome(), PatternOutcome::Failed);

        validator.retry(1000.0);
        assert_eq!(validator.outcome(), PatternOutcome::Pending);
        validator.validate(Some(64), 1100.0);
        let result = validator.validate(Some(60), 1200.0);
        assert!(result.pattern_complete);
        assert_eq!(result.response_time_ms, 200.0);
    }

    #[test]
    fn test_level_tally_resets_independently() {
        let mut validator = Validator::new();
        let single = Pattern::fallback(DifficultyLevel::SingleNote, "c", 0.0);
        validator.reset_for_new_pattern(&single, 0.0);
        validator.validate(Some(60), 10.0);
        validator.reset_level_tally();
        assert_eq!(validator.level_metrics().total_notes, 0);
        assert_eq!(validator.session().total_notes, 1);
    }
}
