//! Session summary and rule-based recommendations

use super::metrics::DifficultyMetric;
use super::progress::Trend;
use crate::config::AnalyticsConfig;
use crate::types::difficulty::DifficultyLevel;

/// Per-difficulty line of a summary
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DifficultySummary {
    pub difficulty: DifficultyLevel,
    pub attempts: u64,
    pub correct_attempts: u64,
    pub accuracy: f64,
    pub average_time_ms: f64,
}

impl From<&DifficultyMetric> for DifficultySummary {
    fn from(metric: &DifficultyMetric) -> Self {
        DifficultySummary {
            difficulty: metric.difficulty,
            attempts: metric.attempts,
            correct_attempts: metric.correct_attempts,
            accuracy: metric.accuracy(),
            average_time_ms: metric.average_time_ms(),
        }
    }
}

/// Read-only snapshot of a session, computed on demand
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionSummary {
    pub total_attempts: u64,
    pub correct_attempts: u64,
    pub accuracy: f64,
    pub average_response_ms: f64,
    pub difficulties: Vec<DifficultySummary>,
    pub strengths: Vec<DifficultyLevel>,
    pub weaknesses: Vec<DifficultyLevel>,
    pub recommendations: Vec<String>,
    pub patterns_tracked: usize,
    pub notes_tracked: usize,
    pub trend: Trend,
}

pub(crate) fn is_strength(metric: &DifficultyMetric, config: &AnalyticsConfig) -> bool {
    metric.attempts >= config.classification_min_attempts
        && metric.accuracy() >= config.strength_accuracy
}

pub(crate) fn is_weakness(metric: &DifficultyMetric, config: &AnalyticsConfig) -> bool {
    metric.attempts >= config.classification_min_attempts
        && metric.accuracy() < config.weakness_accuracy
}

fn weakness_advice(difficulty: DifficultyLevel) -> &'static str {
    match difficulty {
        DifficultyLevel::SingleNote => {
            "Single notes need work: name each note out loud before you play it."
        }
        DifficultyLevel::Interval => {
            "Intervals need work: hear the distance between the two notes before you play."
        }
        DifficultyLevel::Triad => {
            "Triads need work: practise major and minor shapes slowly, one hand at a time."
        }
    }
}

/// Ordered advice: one line per weakness, then an escalation hint, then a
/// default when neither applies.
pub(crate) fn recommendations(
    metrics: &[DifficultyMetric],
    config: &AnalyticsConfig,
) -> Vec<String> {
    let mut advice: Vec<String> = metrics
        .iter()
        .filter(|m| is_weakness(m, config))
        .map(|m| weakness_advice(m.difficulty).to_string())
        .collect();

    let ready = metrics
        .iter()
        .filter(|m| {
            m.accuracy() > config.escalation_accuracy && m.attempts > config.escalation_min_attempts
        })
        .map(|m| m.difficulty)
        .max();
    if let Some(level) = ready {
        let hint = match level.next() {
            Some(next) => format!(
                "{} are above {:.0}% accuracy: try moving up to {}.",
                level.label(),
                config.escalation_accuracy * 100.0,
                next.label().to_lowercase()
            ),
            None => format!(
                "{} are above {:.0}% accuracy: widen the note pool for a new challenge.",
                level.label(),
                config.escalation_accuracy * 100.0
            ),
        };
        advice.push(hint);
    }

    if advice.is_empty() {
        let total: u64 = metrics.iter().map(|m| m.attempts).sum();
        advice.push(if total == 0 {
            "Play a few patterns to get personalised recommendations.".to_string()
        } else {
            "Keep practising at this level to build consistency.".to_string()
        });
    }

    advice
}
