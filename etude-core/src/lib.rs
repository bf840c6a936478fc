//! # Etude Core
//!
//! WASM-compatible engine for adaptive sight-reading practice. Generates short
//! note, interval and triad challenges, keeps a lookahead queue of them ready,
//! validates played notes, and tracks performance to drive optional
//! difficulty escalation. No audio, MIDI or filesystem dependencies.
//!
//! ## Features
//!
//! - **serde**: JSON (de)serialization of configuration, patterns and analytics
//! - **wasm**: WASM bindings via wasm-bindgen
//! - **colored**: Colored terminal output (disabled in WASM)
//!
//! ## Example
//!
//! ```ignore
//! use etude_core::{DifficultyLevel, EngineConfig, PracticeEngine};
//!
//! let mut engine = PracticeEngine::new(EngineConfig::default())?;
//! engine.start_session(DifficultyLevel::Interval);
//! let pattern = engine.get_next_pattern();
//! println!("Play: {}", pattern);
//! ```

pub mod adaptive;
pub mod analytics;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod notation;
pub mod persistence;
pub mod queue;
pub mod scheduler;
pub mod theory;
pub mod types;
pub mod validator;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use adaptive::{next_difficulty, AdaptiveThresholds, PerformanceMetrics};
pub use analytics::{AnalyticsSnapshot, PatternProgress, SessionAnalytics, SessionSummary, Trend};
pub use config::{AnalyticsConfig, EngineConfig, GeneratorConfig, QueueConfig};
pub use engine::PracticeEngine;
pub use error::{EngineError, EngineResult, GenerationError};
pub use persistence::{MemoryStore, SessionRecord, SessionStore};
pub use queue::{QueueStats, QueueStatus};
pub use theory::{NotePool, PoolTier, WeightTable};
pub use types::{DifficultyLevel, MidiEvent, MidiEventKind, Pattern, PatternNote, PatternNotes, Pitch};
pub use validator::{PatternOutcome, ValidationResult};
