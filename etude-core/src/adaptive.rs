//! Difficulty controller
//!
//! A pure mapping from recent performance to the difficulty the next patterns
//! should be generated at. Progression is monotonic: it only ever moves one
//! tier up, never down.

use crate::types::difficulty::DifficultyLevel;

/// Performance snapshot fed to [`next_difficulty`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerformanceMetrics {
    pub total_notes: u64,
    pub accuracy: f64,
    pub average_response_ms: f64,
    pub streak: u32,
}

/// Bars a learner has to clear before escalation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdaptiveThresholds {
    pub min_notes: u64,
    pub min_accuracy: f64,
    pub max_response_ms: f64,
    pub min_streak: u32,
}

impl Default for AdaptiveThresholds {
    fn default() -> Self {
        AdaptiveThresholds {
            min_notes: 10,
            min_accuracy: 0.85,
            max_response_ms: 120.0,
            min_streak: 10,
        }
    }
}

impl AdaptiveThresholds {
    fn is_met_by(&self, metrics: &PerformanceMetrics) -> bool {
        metrics.accuracy >= self.min_accuracy
            && metrics.average_response_ms <= self.max_response_ms
            && metrics.streak >= self.min_streak
    }
}

/// Difficulty for upcoming patterns.
///
/// Unchanged unless adaptation is enabled and enough notes have been played.
/// Escalates exactly one tier when accuracy, response time and streak all
/// clear their thresholds.
pub fn next_difficulty(
    current: DifficultyLevel,
    metrics: &PerformanceMetrics,
    adaptive_enabled: bool,
    thresholds: &AdaptiveThresholds,
) -> DifficultyLevel {
    if !adaptive_enabled || metrics.total_notes < thresholds.min_notes {
        return current;
    }
    // NaN metrics fail every comparison and keep the current tier
    if !thresholds.is_met_by(metrics) {
        return current;
    }
    current.next().unwrap_or(current)
}
