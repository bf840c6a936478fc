//! Session analytics
//!
//! Every recorded attempt updates three aggregates in place: per pattern,
//! per MIDI note and per difficulty. Summaries and queries read those running
//! sums and never rescan raw attempt history, except for the per-pattern
//! progress split which only walks that one pattern's attempts.

pub mod metrics;
pub mod progress;
pub mod snapshot;
pub mod summary;

use crate::config::AnalyticsConfig;
use crate::error::EngineResult;
use crate::types::difficulty::DifficultyLevel;
use crate::types::note::MIDI_MAX;
use std::collections::{BTreeMap, HashMap, VecDeque};

pub use metrics::{AttemptSample, DifficultyMetric, NoteMetric, PatternMetric};
pub use progress::{PatternProgress, Trend};
pub use snapshot::{AnalyticsSnapshot, SNAPSHOT_VERSION};
pub use summary::{DifficultySummary, SessionSummary};

/// One finished pattern attempt
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttemptRecord {
    pub pattern_id: String,
    pub difficulty: DifficultyLevel,
    pub correct: bool,
    pub midi_notes: Vec<u8>,
    pub attempt_time_ms: f64,
    pub timestamp_ms: f64,
}

#[derive(Debug, Clone)]
pub struct SessionAnalytics {
    config: AnalyticsConfig,
    patterns: HashMap<String, PatternMetric>,
    notes: BTreeMap<u8, NoteMetric>,
    difficulties: [DifficultyMetric; 3],
    recent: VecDeque<bool>,
}

fn fresh_difficulties() -> [DifficultyMetric; 3] {
    DifficultyLevel::ALL.map(DifficultyMetric::new)
}

impl SessionAnalytics {
    pub fn new(config: AnalyticsConfig) -> Self {
        SessionAnalytics {
            config,
            patterns: HashMap::new(),
            notes: BTreeMap::new(),
            difficulties: fresh_difficulties(),
            recent: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AnalyticsConfig) {
        self.config = config;
        while self.recent.len() > self.config.trend_window {
            self.recent.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.patterns.clear();
        self.notes.clear();
        self.difficulties = fresh_difficulties();
        self.recent.clear();
    }

    pub fn record(&mut self, record: &AttemptRecord) {
        // Timing of a malformed attempt still counts, just without a duration
        let time_ms = if record.attempt_time_ms.is_finite() {
            record.attempt_time_ms.max(0.0)
        } else {
            0.0
        };
        let midi_notes: Vec<u8> = record
            .midi_notes
            .iter()
            .copied()
            .filter(|&m| m <= MIDI_MAX)
            .collect();

        self.patterns
            .entry(record.pattern_id.clone())
            .or_insert_with(|| {
                PatternMetric::new(record.pattern_id.clone(), record.difficulty, midi_notes.clone())
            })
            .record(AttemptSample {
                correct: record.correct,
                time_ms,
                timestamp_ms: record.timestamp_ms,
            });

        for &midi in &midi_notes {
            self.notes
                .entry(midi)
                .or_insert_with(|| NoteMetric::new(midi))
                .record(record.correct, time_ms);
        }

        self.difficulties[record.difficulty.index()].record(record.correct, time_ms);

        if self.config.trend_window > 0 {
            if self.recent.len() == self.config.trend_window {
                self.recent.pop_front();
            }
            self.recent.push_back(record.correct);
        }
    }

    pub fn total_attempts(&self) -> u64 {
        self.difficulties.iter().map(|m| m.attempts).sum()
    }

    pub fn difficulty_metric(&self, difficulty: DifficultyLevel) -> &DifficultyMetric {
        &self.difficulties[difficulty.index()]
    }

    pub fn pattern_metric(&self, pattern_id: &str) -> Option<&PatternMetric> {
        self.patterns.get(pattern_id)
    }

    pub fn note_metric(&self, midi: u8) -> Option<&NoteMetric> {
        self.notes.get(&midi)
    }

    pub fn session_summary(&self) -> SessionSummary {
        let total_attempts = self.total_attempts();
        let correct_attempts: u64 = self.difficulties.iter().map(|m| m.correct_attempts).sum();
        let total_time: f64 = self.difficulties.iter().map(|m| m.total_time_ms).sum();
        let (accuracy, average_response_ms) = if total_attempts == 0 {
            (0.0, 0.0)
        } else {
            (
                correct_attempts as f64 / total_attempts as f64,
                total_time / total_attempts as f64,
            )
        };

        SessionSummary {
            total_attempts,
            correct_attempts,
            accuracy,
            average_response_ms,
            difficulties: self.difficulties.iter().map(DifficultySummary::from).collect(),
            strengths: self
                .difficulties
                .iter()
                .filter(|m| summary::is_strength(m, &self.config))
                .map(|m| m.difficulty)
                .collect(),
            weaknesses: self
                .difficulties
                .iter()
                .filter(|m| summary::is_weakness(m, &self.config))
                .map(|m| m.difficulty)
                .collect(),
            recommendations: summary::recommendations(&self.difficulties, &self.config),
            patterns_tracked: self.patterns.len(),
            notes_tracked: self.notes.len(),
            trend: self.trend(),
        }
    }

    pub fn pattern_progress(&self, pattern_id: &str) -> Option<PatternProgress> {
        self.patterns
            .get(pattern_id)
            .map(|metric| progress::pattern_progress(metric, &self.config))
    }

    pub fn trend(&self) -> Trend {
        let outcomes: Vec<bool> = self.recent.iter().copied().collect();
        progress::trend(&outcomes)
    }

    /// Patterns answered correctly less often than the problem threshold, worst first
    pub fn problem_patterns(&self) -> Vec<&PatternMetric> {
        let mut found: Vec<&PatternMetric> = self
            .patterns
            .values()
            .filter(|m| {
                m.attempts >= self.config.query_min_attempts
                    && m.accuracy() < self.config.problem_accuracy
            })
            .collect();
        found.sort_by(|a, b| {
            a.accuracy()
                .total_cmp(&b.accuracy())
                .then(b.attempts.cmp(&a.attempts))
                .then(a.pattern_id.cmp(&b.pattern_id))
        });
        found
    }

    /// Patterns slower on average than the slow threshold, slowest first
    pub fn slow_patterns(&self) -> Vec<&PatternMetric> {
        let mut found: Vec<&PatternMetric> = self
            .patterns
            .values()
            .filter(|m| {
                m.attempts >= self.config.query_min_attempts
                    && m.average_time_ms() > self.config.slow_time_ms
            })
            .collect();
        found.sort_by(|a, b| {
            b.average_time_ms()
                .total_cmp(&a.average_time_ms())
                .then(a.pattern_id.cmp(&b.pattern_id))
        });
        found
    }

    /// Notes below the problematic accuracy threshold, worst first
    pub fn problematic_notes(&self) -> Vec<&NoteMetric> {
        let mut found: Vec<&NoteMetric> = self
            .notes
            .values()
            .filter(|m| {
                m.attempts >= self.config.query_min_attempts
                    && m.accuracy() < self.config.problematic_note_accuracy
            })
            .collect();
        found.sort_by(|a, b| a.accuracy().total_cmp(&b.accuracy()).then(a.midi.cmp(&b.midi)));
        found
    }

    /// Every pattern metric sorted by id
    pub fn pattern_metrics(&self) -> Vec<&PatternMetric> {
        let mut all: Vec<&PatternMetric> = self.patterns.values().collect();
        all.sort_by(|a, b| a.pattern_id.cmp(&b.pattern_id));
        all
    }

    pub fn note_metrics(&self) -> impl Iterator<Item = &NoteMetric> {
        self.notes.values()
    }

    pub fn export(&self) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            version: SNAPSHOT_VERSION,
            patterns: self.pattern_metrics().into_iter().cloned().collect(),
            notes: self.notes.values().cloned().collect(),
            difficulties: self.difficulties.to_vec(),
            recent_outcomes: self.recent.iter().copied().collect(),
        }
    }

    /// Replace all state with `snapshot`; live state is untouched on error
    pub fn import(&mut self, snapshot: AnalyticsSnapshot) -> EngineResult<()> {
        snapshot.validate()?;

        let mut difficulties = fresh_difficulties();
        for metric in snapshot.difficulties {
            let index = metric.difficulty.index();
            difficulties[index] = metric;
        }

        self.patterns = snapshot
            .patterns
            .into_iter()
            .map(|m| (m.pattern_id.clone(), m))
            .collect();
        self.notes = snapshot.notes.into_iter().map(|m| (m.midi, m)).collect();
        self.difficulties = difficulties;
        self.recent = snapshot.recent_outcomes.into_iter().collect();
        while self.recent.len() > self.config.trend_window {
            self.recent.pop_front();
        }
        Ok(())
    }
}

impl Default for SessionAnalytics {
    fn default() -> Self {
        Self::new(AnalyticsConfig::default())
    }
}
