//! Per-pattern progress and session trend

use super::metrics::{AttemptSample, PatternMetric};
use crate::config::AnalyticsConfig;

/// Tolerance for the band checks; accuracy of 0.6 sits exactly on a 0.1 band
const BAND_EPSILON: f64 = 1e-9;

/// Improvement on one pattern between the older and newer half of its attempts
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternProgress {
    pub pattern_id: String,
    pub attempts: u64,
    pub accuracy: f64,
    pub earlier_accuracy: f64,
    pub recent_accuracy: f64,
    /// Positive when the newer half is more accurate
    pub accuracy_delta: f64,
    pub earlier_average_ms: f64,
    pub recent_average_ms: f64,
    /// Negative when the newer half is faster
    pub time_delta_ms: f64,
    /// Attempt times of the last window vary by less than the plateau CV
    pub plateau: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Trend {
    Improving,
    Stable,
    Declining,
    /// Too few attempts to say
    Insufficient,
}

fn accuracy_of(samples: &[AttemptSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().filter(|s| s.correct).count() as f64 / samples.len() as f64
}

fn mean_time(samples: &[AttemptSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.time_ms).sum::<f64>() / samples.len() as f64
}

/// Coefficient of variation (population standard deviation over mean)
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return None;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt() / mean)
}

pub(crate) fn pattern_progress(metric: &PatternMetric, config: &AnalyticsConfig) -> PatternProgress {
    let history = &metric.history;
    let n = history.len();

    let (earlier, recent) = if n >= 2 {
        history.split_at(n / 2)
    } else {
        (&history[..], &history[..])
    };

    let accuracy = accuracy_of(history);
    let earlier_accuracy = accuracy_of(earlier);
    let recent_accuracy = accuracy_of(recent);
    let accuracy_delta = recent_accuracy - earlier_accuracy;
    let earlier_average_ms = mean_time(earlier);
    let recent_average_ms = mean_time(recent);

    let plateau = n >= config.plateau_window && {
        let window: Vec<f64> = history[n - config.plateau_window..]
            .iter()
            .map(|s| s.time_ms)
            .collect();
        let steady = coefficient_of_variation(&window)
            .map(|cv| cv < config.plateau_cv)
            .unwrap_or(false);
        let flat = accuracy_delta.abs() < config.plateau_accuracy_delta;
        // Alternating right/wrong hovers around 50% without a clear delta
        let oscillating = (accuracy - 0.5).abs() <= config.plateau_band + BAND_EPSILON;
        steady && (flat || oscillating)
    };

    PatternProgress {
        pattern_id: metric.pattern_id.clone(),
        attempts: metric.attempts,
        accuracy,
        earlier_accuracy,
        recent_accuracy,
        accuracy_delta,
        earlier_average_ms,
        recent_average_ms,
        time_delta_ms: recent_average_ms - earlier_average_ms,
        plateau,
    }
}

/// Compare the older and newer half of the most recent outcomes
pub(crate) fn trend(outcomes: &[bool]) -> Trend {
    if outcomes.len() < 4 {
        return Trend::Insufficient;
    }
    let (older, newer) = outcomes.split_at(outcomes.len() / 2);
    let share = |xs: &[bool]| xs.iter().filter(|c| **c).count() as f64 / xs.len() as f64;
    let delta = share(newer) - share(older);
    if delta > 0.1 {
        Trend::Improving
    } else if delta < -0.1 {
        Trend::Declining
    } else {
        Trend::Stable
    }
}
