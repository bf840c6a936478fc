//! Engine configuration
//!
//! Every field has a default, so a JSON document only needs to name the
//! settings it changes:
//!
//! ```json
//! { "starting_difficulty": "interval", "queue": { "capacity": 6 } }
//! ```

use crate::adaptive::AdaptiveThresholds;
use crate::error::{EngineError, EngineResult};
use crate::theory::{PoolTier, WeightTable};
use crate::types::difficulty::DifficultyLevel;

/// Lookahead queue sizing
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct QueueConfig {
    pub capacity: usize,
    /// Background refill starts once the queue holds fewer patterns than this
    pub refill_threshold: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            capacity: 10,
            refill_threshold: 5,
        }
    }
}

/// Pattern generator tuning
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GeneratorConfig {
    pub pool: PoolTier,
    /// Per pitch class weights; `None` uses [`WeightTable::default`]
    pub weights: Option<WeightTable>,
    pub similarity_threshold: f64,
    pub max_attempts: u32,
    pub history_size: usize,
    /// Fixed RNG seed for reproducible sessions
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            pool: PoolTier::WhiteKeys,
            weights: None,
            similarity_threshold: 0.7,
            max_attempts: 10,
            history_size: 5,
            seed: None,
        }
    }
}

/// Classification and query thresholds for session analytics
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnalyticsConfig {
    /// Attempts a difficulty needs before it is called a strength or weakness
    pub classification_min_attempts: u64,
    pub strength_accuracy: f64,
    pub weakness_accuracy: f64,
    pub escalation_accuracy: f64,
    pub escalation_min_attempts: u64,
    /// Attempts a pattern or note needs before the problem queries consider it
    pub query_min_attempts: u64,
    pub problem_accuracy: f64,
    pub slow_time_ms: f64,
    pub problematic_note_accuracy: f64,
    pub plateau_window: usize,
    pub plateau_cv: f64,
    pub plateau_accuracy_delta: f64,
    pub plateau_band: f64,
    pub trend_window: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        AnalyticsConfig {
            classification_min_attempts: 5,
            strength_accuracy: 0.7,
            weakness_accuracy: 0.5,
            escalation_accuracy: 0.9,
            escalation_min_attempts: 10,
            query_min_attempts: 3,
            problem_accuracy: 0.6,
            slow_time_ms: 3000.0,
            problematic_note_accuracy: 0.7,
            plateau_window: 5,
            plateau_cv: 0.1,
            plateau_accuracy_delta: 0.15,
            plateau_band: 0.1,
            trend_window: 10,
        }
    }
}

/// Top level configuration surface of the practice engine
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    pub starting_difficulty: DifficultyLevel,
    pub adaptive_difficulty: bool,
    pub queue: QueueConfig,
    pub generator: GeneratorConfig,
    pub analytics: AnalyticsConfig,
    pub adaptive: AdaptiveThresholds,
}

fn unit_interval(name: &str, value: f64) -> EngineResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{} must be between 0 and 1, got {}",
            name, value
        )))
    }
}

impl EngineConfig {
    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> EngineResult<()> {
        if self.queue.capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        if self.queue.refill_threshold > self.queue.capacity {
            return Err(EngineError::InvalidConfig(format!(
                "refill threshold {} exceeds queue capacity {}",
                self.queue.refill_threshold, self.queue.capacity
            )));
        }

        unit_interval("similarity_threshold", self.generator.similarity_threshold)?;
        if let Some(weights) = &self.generator.weights {
            if !weights.is_usable() {
                return Err(EngineError::InvalidConfig(
                    "weight table needs finite, non-negative weights with a positive sum"
                        .to_string(),
                ));
            }
        }
        if self.generator.max_attempts == 0 {
            return Err(EngineError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        let analytics = &self.analytics;
        unit_interval("strength_accuracy", analytics.strength_accuracy)?;
        unit_interval("weakness_accuracy", analytics.weakness_accuracy)?;
        unit_interval("escalation_accuracy", analytics.escalation_accuracy)?;
        unit_interval("problem_accuracy", analytics.problem_accuracy)?;
        unit_interval("problematic_note_accuracy", analytics.problematic_note_accuracy)?;
        unit_interval("plateau_accuracy_delta", analytics.plateau_accuracy_delta)?;
        unit_interval("plateau_band", analytics.plateau_band)?;
        if analytics.plateau_window < 2 {
            return Err(EngineError::InvalidConfig(
                "plateau_window must cover at least 2 attempts".to_string(),
            ));
        }
        if !(analytics.plateau_cv.is_finite() && analytics.plateau_cv >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "plateau_cv must be a non-negative number, got {}",
                analytics.plateau_cv
            )));
        }

        unit_interval("adaptive.min_accuracy", self.adaptive.min_accuracy)?;
        if !(self.adaptive.max_response_ms.is_finite() && self.adaptive.max_response_ms >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "adaptive.max_response_ms must be a non-negative number, got {}",
                self.adaptive.max_response_ms
            )));
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration document
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn to_json_string(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.starting_difficulty, DifficultyLevel::SingleNote);
        assert!(!config.adaptive_difficulty);
        assert_eq!(config.queue.capacity, 10);
        assert_eq!(config.queue.refill_threshold, 5);
        assert_eq!(config.generator.similarity_threshold, 0.7);
    }

    #[test]
    fn test_rejects_bad_queue() {
        let mut config = EngineConfig::default();
        config.queue.capacity = 0;
        config.queue.refill_threshold = 0;
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));

        let mut config = EngineConfig::default();
        config.queue.refill_threshold = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_thresholds() {
        let mut config = EngineConfig::default();
        config.generator.similarity_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.generator.weights = Some(WeightTable::new([0.0; 12]));
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.analytics.plateau_band = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_json() {
        let config = EngineConfig::from_json_str(
            r#"{ "starting_difficulty": "triad", "adaptive_difficulty": true,
                 "queue": { "capacity": 4, "refill_threshold": 2 },
                 "generator": { "pool": "full-chromatic", "seed": 7 } }"#,
        )
        .unwrap();
        assert_eq!(config.starting_difficulty, DifficultyLevel::Triad);
        assert!(config.adaptive_difficulty);
        assert_eq!(config.queue.capacity, 4);
        assert_eq!(config.generator.pool, PoolTier::FullChromatic);
        assert_eq!(config.generator.seed, Some(7));
        assert_eq!(config.generator.max_attempts, 10);
        assert_eq!(config.analytics, AnalyticsConfig::default());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_errors_are_config_errors() {
        assert!(matches!(
            EngineConfig::from_json_str("{ not json"),
            Err(EngineError::InvalidConfig(_))
        ));
        assert!(EngineConfig::from_json_str(r#"{ "queue": { "capacity": 0 } }"#).is_err());
    }
}
