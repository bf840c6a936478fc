//! Practice session engine
//!
//! `PracticeEngine` owns one session: its pattern queue (and the generator
//! inside it), validator, analytics and configuration. Hosts drive it with
//! three kinds of calls: pattern navigation (`get_next_pattern`, `retry_pattern`),
//! note input (`validate_note`, `handle_midi`) and idle time (`run_idle`).
//!
//! ```ignore
//! let mut engine = PracticeEngine::new(EngineConfig::default())?;
//! engine.start_session(DifficultyLevel::SingleNote);
//! let pattern = engine.get_next_pattern();
//! let result = engine.validate_note(Some(60), now_ms);
//! engine.run_idle(8.0);
//! ```

use crate::adaptive::next_difficulty;
use crate::analytics::{
    AnalyticsSnapshot, AttemptRecord, PatternProgress, SessionAnalytics, SessionSummary,
};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::generator::Generator;
use crate::persistence::{SessionRecord, SessionStore};
use crate::queue::{PatternQueue, QueueStats};
use crate::scheduler::CooperativeScheduler;
use crate::types::difficulty::DifficultyLevel;
use crate::types::midi_event::MidiEvent;
use crate::types::pattern::Pattern;
use crate::validator::{PatternOutcome, SessionTally, ValidationResult, Validator};
use std::rc::Rc;

pub struct PracticeEngine {
    config: EngineConfig,
    clock: Rc<dyn Clock>,
    scheduler: Rc<CooperativeScheduler>,
    queue: PatternQueue,
    validator: Validator,
    analytics: SessionAnalytics,
    store: Option<Box<dyn SessionStore>>,
    difficulty: DifficultyLevel,
    adaptive: bool,
    current: Option<Pattern>,
    attempt_recorded: bool,
    /// A recorded attempt has not reached the store yet
    dirty: bool,
    session_id: Option<String>,
    session_count: u64,
    started_at_ms: f64,
}

impl PracticeEngine {
    /// Engine timed by the system clock
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        Self::with_clock(config, Rc::new(crate::clock::SystemClock::new()))
    }

    pub fn with_clock(config: EngineConfig, clock: Rc<dyn Clock>) -> EngineResult<Self> {
        config.validate()?;

        let scheduler = Rc::new(CooperativeScheduler::new(clock.clone()));
        let generator = Generator::new(&config.generator);
        let queue = PatternQueue::new(&config.queue, generator, clock.clone(), scheduler.clone());

        Ok(PracticeEngine {
            difficulty: config.starting_difficulty,
            adaptive: config.adaptive_difficulty,
            analytics: SessionAnalytics::new(config.analytics),
            config,
            clock,
            scheduler,
            queue,
            validator: Validator::new(),
            store: None,
            current: None,
            attempt_recorded: false,
            dirty: false,
            session_id: None,
            session_count: 0,
            started_at_ms: 0.0,
        })
    }

    /// Attach a persistence collaborator
    pub fn with_store(mut self, store: Box<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn set_store(&mut self, store: Option<Box<dyn SessionStore>>) {
        self.store = store;
    }

    /// Begin a fresh session at `initial`, discarding previous statistics
    pub fn start_session(&mut self, initial: DifficultyLevel) {
        if self.dirty {
            self.persist();
        }
        let now = self.clock.now_ms();
        self.session_count += 1;
        self.session_id = Some(format!("session-{}-{}", now.max(0.0) as u64, self.session_count));
        self.started_at_ms = now;

        self.difficulty = initial;
        self.analytics.clear();
        self.validator.reset_session();
        self.current = None;
        self.attempt_recorded = false;
        self.queue.initialize(initial);

        tracing::info!(
            "Started practice session {} at {} (adaptive: {})",
            self.session_id.as_deref().unwrap_or_default(),
            initial,
            self.adaptive
        );
    }

    /// Advance to the next pattern and make it the validator's target
    pub fn get_next_pattern(&mut self) -> Pattern {
        if self.session_id.is_none() {
            self.start_session(self.config.starting_difficulty);
        }

        let pattern = self.queue.get_next();
        self.validator
            .reset_for_new_pattern(&pattern, self.clock.now_ms());
        self.current = Some(pattern.clone());
        self.attempt_recorded = false;
        tracing::debug!("Next pattern {} ({})", pattern.id(), pattern);
        pattern
    }

    /// Validate one played note against the active pattern
    pub fn validate_note(&mut self, midi_note: Option<u8>, timestamp_ms: f64) -> ValidationResult {
        let result = self.validator.validate(midi_note, timestamp_ms);

        if !self.attempt_recorded {
            let correct = match self.validator.outcome() {
                PatternOutcome::Completed => Some(true),
                PatternOutcome::Failed => Some(false),
                PatternOutcome::Pending => None,
            };
            if let Some(correct) = correct {
                self.finish_attempt(correct, result.response_time_ms, timestamp_ms);
            }
        }

        result
    }

    /// Validate note-on events; everything else is ignored
    pub fn handle_midi(&mut self, event: MidiEvent) -> Option<ValidationResult> {
        if !event.is_playable() {
            return None;
        }
        Some(self.validate_note(Some(event.note), event.timestamp_ms))
    }

    fn finish_attempt(&mut self, correct: bool, attempt_time_ms: f64, timestamp_ms: f64) {
        let Some(pattern) = &self.current else {
            return;
        };
        self.attempt_recorded = true;

        let record = AttemptRecord {
            pattern_id: pattern.signature(),
            difficulty: pattern.difficulty(),
            correct,
            midi_notes: pattern.midi_notes(),
            attempt_time_ms,
            timestamp_ms,
        };
        self.analytics.record(&record);

        let next = next_difficulty(
            self.difficulty,
            &self.validator.level_metrics(),
            self.adaptive,
            &self.config.adaptive,
        );
        if next != self.difficulty {
            tracing::info!("Adaptive difficulty: {} -> {}", self.difficulty, next);
            self.retarget(next);
        }

        self.dirty = self.store.is_some();
    }

    /// Change difficulty; takes effect from the next pattern
    pub fn set_difficulty(&mut self, level: DifficultyLevel) {
        if level == self.difficulty && self.queue.difficulty() == level {
            return;
        }
        self.retarget(level);
    }

    fn retarget(&mut self, level: DifficultyLevel) {
        self.difficulty = level;
        self.validator.reset_level_tally();
        self.queue.change_difficulty(level);
    }

    pub fn set_adaptive(&mut self, enabled: bool) {
        self.adaptive = enabled;
        tracing::info!("Adaptive difficulty {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Restart the active pattern; the previous attempt stays recorded
    pub fn retry_pattern(&mut self) -> Option<Pattern> {
        let pattern = self.current.clone()?;
        self.validator.retry(self.clock.now_ms());
        self.attempt_recorded = false;
        Some(pattern)
    }

    /// Clear statistics and return to the configured starting difficulty
    pub fn reset_session(&mut self) {
        tracing::info!("Resetting practice session");
        self.start_session(self.config.starting_difficulty);
    }

    /// Give background work up to `budget_ms`; returns the number of tasks run.
    ///
    /// Unsaved attempts are flushed to the store after the refill slice.
    pub fn run_idle(&mut self, budget_ms: f64) -> usize {
        let ran = self.scheduler.run_slice(budget_ms);
        if self.dirty {
            self.persist();
            return ran + 1;
        }
        ran
    }

    pub fn has_pending_work(&self) -> bool {
        self.dirty || !self.scheduler.is_idle()
    }

    /// Whether recorded attempts are waiting for the next idle flush
    pub fn has_unsaved_attempts(&self) -> bool {
        self.dirty
    }

    /// Hand the current session record to the store. Failures are logged only.
    pub fn persist(&mut self) {
        self.dirty = false;
        if self.store.is_none() {
            return;
        }
        let Some(record) = self.session_record() else {
            return;
        };
        if let Some(store) = self.store.as_mut() {
            match store.save_or_update_session(&record) {
                Ok(()) => tracing::debug!("Saved session {}", record.session_id),
                Err(e) => tracing::error!("Failed to save session {}: {:#}", record.session_id, e),
            }
        }
    }

    /// Snapshot for persistence; `None` before a session has started
    pub fn session_record(&self) -> Option<SessionRecord> {
        let session_id = self.session_id.clone()?;
        Some(SessionRecord {
            session_id,
            started_at_ms: self.started_at_ms,
            saved_at_ms: self.clock.now_ms(),
            difficulty: self.difficulty,
            adaptive: self.adaptive,
            summary: self.analytics.session_summary(),
            notes: *self.validator.session(),
            note_metrics: self.analytics.note_metrics().cloned().collect(),
            pattern_metrics: self
                .analytics
                .pattern_metrics()
                .into_iter()
                .cloned()
                .collect(),
        })
    }

    /// Validate and apply new settings.
    ///
    /// Queue sizing, generator tuning and thresholds apply immediately.
    /// Queued patterns are kept, so the current difficulty is unaffected.
    pub fn apply_config(&mut self, config: EngineConfig) -> EngineResult<()> {
        config.validate()?;
        self.queue.reconfigure(&config.queue, &config.generator);
        self.analytics.set_config(config.analytics);
        self.adaptive = config.adaptive_difficulty;
        self.config = config;
        tracing::info!("Applied new engine configuration");
        Ok(())
    }

    pub fn session_summary(&self) -> SessionSummary {
        self.analytics.session_summary()
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    pub fn pattern_progress(&self, pattern_id: &str) -> Option<PatternProgress> {
        self.analytics.pattern_progress(pattern_id)
    }

    pub fn export_analytics(&self) -> AnalyticsSnapshot {
        self.analytics.export()
    }

    pub fn import_analytics(&mut self, snapshot: AnalyticsSnapshot) -> EngineResult<()> {
        self.analytics.import(snapshot)
    }

    pub fn analytics(&self) -> &SessionAnalytics {
        &self.analytics
    }

    pub fn note_stats(&self) -> &SessionTally {
        self.validator.session()
    }

    pub fn current_pattern(&self) -> Option<&Pattern> {
        self.current.as_ref()
    }

    pub fn outcome(&self) -> PatternOutcome {
        self.validator.outcome()
    }

    pub fn difficulty(&self) -> DifficultyLevel {
        self.difficulty
    }

    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }
}

impl Drop for PracticeEngine {
    fn drop(&mut self) {
        self.queue.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::persistence::MemoryStore;

    fn engine() -> (Rc<ManualClock>, PracticeEngine) {
        let clock = Rc::new(ManualClock::new(0.0));
        let mut config = EngineConfig::default();
        config.generator.seed = Some(5);
        let engine = PracticeEngine::with_clock(config, clock.clone()).unwrap();
        (clock, engine)
    }

    /// Play every note of the active pattern correctly, `gap_ms` apart
    fn play_correct(clock: &ManualClock, engine: &mut PracticeEngine, gap_ms: f64) -> ValidationResult {
        let notes = engine.current_pattern().unwrap().midi_notes();
        let mut last = ValidationResult::rejected();
        for note in notes {
            clock.advance(gap_ms);
            last = engine.validate_note(Some(note), clock.now_ms());
        }
        last
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.queue.capacity = 0;
        assert!(PracticeEngine::with_clock(config, Rc::new(ManualClock::new(0.0))).is_err());
    }

    #[test]
    fn test_session_flow_records_attempts() {
        let (clock, mut engine) = engine();
        engine.start_session(DifficultyLevel::SingleNote);
        let pattern = engine.get_next_pattern();
        assert_eq!(pattern.difficulty(), DifficultyLevel::SingleNote);

        let result = play_correct(&clock, &mut engine, 250.0);
        assert!(result.correct && result.pattern_complete);
        assert_eq!(result.response_time_ms, 250.0);

        let summary = engine.session_summary();
        assert_eq!(summary.total_attempts, 1);
        assert_eq!(summary.correct_attempts, 1);
        let progress = engine.pattern_progress(&pattern.signature()).unwrap();
        assert_eq!(progress.attempts, 1);
    }

    #[test]
    fn test_failed_attempt_recorded_once() {
        let (clock, mut engine) = engine();
        engine.start_session(DifficultyLevel::SingleNote);
        let pattern = engine.get_next_pattern();
        let wrong = if pattern.midi_notes()[0] == 60 { 62 } else { 60 };
        clock.advance(100.0);
        engine.validate_note(Some(wrong), clock.now_ms());
        engine.validate_note(Some(wrong), clock.now_ms());
        engine.validate_note(Some(pattern.midi_notes()[0]), clock.now_ms());

        let summary = engine.session_summary();
        assert_eq!(summary.total_attempts, 1);
        assert_eq!(summary.correct_attempts, 0);
        assert_eq!(engine.note_stats().total_notes, 3);
        assert_eq!(engine.outcome(), PatternOutcome::Failed);
    }

    #[test]
    fn test_retry_records_a_second_attempt() {
        let (clock, mut engine) = engine();
        engine.start_session(DifficultyLevel::SingleNote);
        let pattern = engine.get_next_pattern();
        let wrong = if pattern.midi_notes()[0] == 79 { 77 } else { 79 };
        engine.validate_note(Some(wrong), clock.now_ms());

        let retried = engine.retry_pattern().unwrap();
        assert_eq!(retried.id(), pattern.id());
        play_correct(&clock, &mut engine, 300.0);

        let metric = engine
            .analytics()
            .pattern_metric(&pattern.signature())
            .unwrap();
        assert_eq!(metric.attempts, 2);
        assert_eq!(metric.correct_attempts, 1);
    }

    #[test]
    fn test_set_difficulty_applies_to_next_pattern() {
        let (_clock, mut engine) = engine();
        engine.start_session(DifficultyLevel::SingleNote);
        engine.get_next_pattern();
        engine.set_difficulty(DifficultyLevel::Triad);
        assert_eq!(
            engine.current_pattern().unwrap().difficulty(),
            DifficultyLevel::SingleNote
        );
        for _ in 0..15 {
            assert_eq!(engine.get_next_pattern().difficulty(), DifficultyLevel::Triad);
            engine.run_idle(16.0);
        }
    }

    #[test]
    fn test_adaptive_escalation_retargets_queue() {
        let (clock, mut engine) = engine();
        engine.set_adaptive(true);
        engine.start_session(DifficultyLevel::SingleNote);

        for _ in 0..10 {
            engine.get_next_pattern();
            play_correct(&clock, &mut engine, 50.0);
        }
        assert_eq!(engine.difficulty(), DifficultyLevel::Interval);
        assert_eq!(engine.get_next_pattern().difficulty(), DifficultyLevel::Interval);

        // A fresh tally is needed before the next escalation
        play_correct(&clock, &mut engine, 50.0);
        assert_eq!(engine.difficulty(), DifficultyLevel::Interval);
    }

    #[test]
    fn test_slow_player_stays_put() {
        let (clock, mut engine) = engine();
        engine.set_adaptive(true);
        engine.start_session(DifficultyLevel::SingleNote);
        for _ in 0..20 {
            engine.get_next_pattern();
            play_correct(&clock, &mut engine, 400.0);
        }
        assert_eq!(engine.difficulty(), DifficultyLevel::SingleNote);
    }

    #[test]
    fn test_handle_midi_filters_events() {
        let (clock, mut engine) = engine();
        engine.start_session(DifficultyLevel::SingleNote);
        let pattern = engine.get_next_pattern();
        let note = pattern.midi_notes()[0];
        clock.advance(80.0);

        assert_eq!(engine.handle_midi(MidiEvent::note_off(note, clock.now_ms())), None);
        assert_eq!(engine.handle_midi(MidiEvent::note_on(note, 0, clock.now_ms())), None);
        let result = engine
            .handle_midi(MidiEvent::note_on(note, 90, clock.now_ms()))
            .unwrap();
        assert!(result.pattern_complete);
    }

    #[test]
    fn test_persistence_after_attempt() {
        let (clock, engine) = engine();
        let store = MemoryStore::new();
        let mut engine = engine.with_store(Box::new(store.clone()));
        engine.start_session(DifficultyLevel::SingleNote);
        engine.get_next_pattern();
        play_correct(&clock, &mut engine, 120.0);

        // Saving waits for idle time
        let id = engine.session_id().unwrap().to_string();
        assert!(store.get(&id).is_none());
        assert!(engine.has_unsaved_attempts());
        assert!(engine.has_pending_work());

        engine.run_idle(8.0);
        assert!(!engine.has_unsaved_attempts());
        let record = store.get(&id).unwrap();
        assert_eq!(record.summary.total_attempts, 1);
        assert_eq!(record.notes.total_notes, 1);
        assert_eq!(record.pattern_metrics.len(), 1);
    }

    #[test]
    fn test_persistence_failure_is_swallowed() {
        let (clock, engine) = engine();
        let mut engine = engine.with_store(Box::new(MemoryStore::failing()));
        engine.start_session(DifficultyLevel::SingleNote);
        engine.get_next_pattern();
        let result = play_correct(&clock, &mut engine, 120.0);
        assert!(result.pattern_complete);
        engine.run_idle(8.0);
        assert_eq!(engine.session_summary().total_attempts, 1);
        assert!(!engine.has_unsaved_attempts());
    }

    #[test]
    fn test_validation_never_touches_store() {
        let (clock, engine) = engine();
        let store = MemoryStore::new();
        let mut engine = engine.with_store(Box::new(store.clone()));
        engine.start_session(DifficultyLevel::SingleNote);
        for _ in 0..5 {
            engine.get_next_pattern();
            play_correct(&clock, &mut engine, 90.0);
        }
        let id = engine.session_id().unwrap().to_string();
        assert!(store.get(&id).is_none());

        // One flush carries every attempt so far
        engine.run_idle(8.0);
        assert_eq!(store.get(&id).unwrap().summary.total_attempts, 5);
    }

    #[test]
    fn test_no_store_means_no_pending_flush() {
        let (clock, mut engine) = engine();
        engine.start_session(DifficultyLevel::SingleNote);
        engine.get_next_pattern();
        play_correct(&clock, &mut engine, 90.0);
        assert!(!engine.has_unsaved_attempts());
    }

    #[test]
    fn test_new_session_flushes_previous() {
        let (clock, engine) = engine();
        let store = MemoryStore::new();
        let mut engine = engine.with_store(Box::new(store.clone()));
        engine.start_session(DifficultyLevel::SingleNote);
        engine.get_next_pattern();
        play_correct(&clock, &mut engine, 90.0);
        let first = engine.session_id().unwrap().to_string();

        clock.advance(1000.0);
        engine.reset_session();
        assert_eq!(store.get(&first).unwrap().summary.total_attempts, 1);
    }

    #[test]
    fn test_reset_session_clears_everything() {
        let (clock, mut engine) = engine();
        engine.start_session(DifficultyLevel::Interval);
        engine.get_next_pattern();
        play_correct(&clock, &mut engine, 100.0);
        engine.reset_session();

        assert_eq!(engine.session_summary().total_attempts, 0);
        assert_eq!(engine.note_stats().total_notes, 0);
        assert_eq!(engine.difficulty(), DifficultyLevel::SingleNote);
        assert!(engine.current_pattern().is_none());
        assert_eq!(engine.queue_stats().size, 10);
    }

    #[test]
    fn test_implicit_session_start() {
        let (_clock, mut engine) = engine();
        let pattern = engine.get_next_pattern();
        assert!(engine.session_id().is_some());
        assert_eq!(pattern.difficulty(), DifficultyLevel::SingleNote);
    }

    #[test]
    fn test_apply_config() {
        let (_clock, mut engine) = engine();
        engine.start_session(DifficultyLevel::SingleNote);
        let mut config = engine.config().clone();
        config.queue.capacity = 4;
        config.queue.refill_threshold = 2;
        config.adaptive_difficulty = true;
        engine.apply_config(config).unwrap();
        assert!(engine.is_adaptive());
        assert_eq!(engine.queue_stats().capacity, 4);

        let mut bad = engine.config().clone();
        bad.queue.refill_threshold = 9;
        assert!(engine.apply_config(bad).is_err());
        assert_eq!(engine.queue_stats().capacity, 4);
    }
}
