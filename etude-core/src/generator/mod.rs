//! Pattern generation
//!
//! The generator draws a weighted base note from its pool, derives the rest of
//! the pattern from a weighted interval or triad shape, and rejects candidates
//! that are too close to the previously accepted pattern. Generation never
//! fails from the caller's point of view: [`Generator::generate`] falls back to
//! a canonical middle-C pattern when a candidate cannot be built.

pub mod similarity;
pub mod weighted;

use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::theory::{NotePool, WeightTable, INTERVALS, TRIADS};
use crate::types::difficulty::DifficultyLevel;
use crate::types::note::MIDI_MAX;
use crate::types::pattern::{Pattern, PatternNote, PatternNotes};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;

pub use similarity::similarity;
pub use weighted::weighted_choice;

/// Weighted, history-aware pattern generator
#[derive(Debug)]
pub struct Generator {
    rng: StdRng,
    pool: NotePool,
    weights: WeightTable,
    history: VecDeque<PatternNotes>,
    history_size: usize,
    similarity_threshold: f64,
    max_attempts: u32,
    next_id: u64,
    fallback_count: u64,
}

impl Generator {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self::with_pool(config, config.pool.pool())
    }

    /// Generator drawing from an explicit pool instead of the configured tier
    pub fn with_pool(config: &GeneratorConfig, pool: NotePool) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Generator {
            rng,
            pool,
            weights: config.weights.unwrap_or_default(),
            history: VecDeque::with_capacity(config.history_size),
            history_size: config.history_size,
            similarity_threshold: config.similarity_threshold,
            max_attempts: config.max_attempts.max(1),
            next_id: 0,
            fallback_count: 0,
        }
    }

    /// Apply new tuning without resetting the RNG or id sequence
    pub fn reconfigure(&mut self, config: &GeneratorConfig) {
        self.pool = config.pool.pool();
        self.weights = config.weights.unwrap_or_default();
        self.history_size = config.history_size;
        self.similarity_threshold = config.similarity_threshold;
        self.max_attempts = config.max_attempts.max(1);
        while self.history.len() > self.history_size {
            self.history.pop_front();
        }
    }

    pub fn pool(&self) -> &NotePool {
        &self.pool
    }

    /// Number of times the canonical fallback was served
    pub fn fallback_count(&self) -> u64 {
        self.fallback_count
    }

    /// Recently accepted patterns, oldest first
    pub fn history(&self) -> impl Iterator<Item = &PatternNotes> {
        self.history.iter()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Generate a pattern, substituting the canonical fallback on failure
    pub fn generate(&mut self, difficulty: DifficultyLevel, now_ms: f64) -> Pattern {
        match self.try_generate(difficulty, now_ms) {
            Ok(pattern) => pattern,
            Err(err) => {
                self.fallback_count += 1;
                tracing::warn!(
                    "Pattern generation failed ({}), serving {} fallback",
                    err,
                    difficulty
                );
                let pattern = Pattern::fallback(difficulty, self.allocate_id(), now_ms);
                self.remember(pattern.pattern_notes().clone());
                pattern
            }
        }
    }

    /// Generate a pattern, surfacing the first candidate that cannot be built
    pub fn try_generate(
        &mut self,
        difficulty: DifficultyLevel,
        now_ms: f64,
    ) -> Result<Pattern, GenerationError> {
        if self.pool.is_empty() {
            return Err(GenerationError::EmptyPool);
        }

        let mut attempts = 0;
        let notes = loop {
            attempts += 1;
            let candidate = self.build_candidate(difficulty)?;
            let too_similar = self
                .history
                .back()
                .map(|previous| similarity(previous, &candidate) >= self.similarity_threshold)
                .unwrap_or(false);

            if !too_similar {
                break candidate;
            }
            if attempts >= self.max_attempts {
                tracing::debug!(
                    "Accepting repeated {} pattern after {} attempts",
                    difficulty,
                    attempts
                );
                break candidate;
            }
        };

        self.remember(notes.clone());
        Ok(Pattern::new(self.allocate_id(), notes, now_ms))
    }

    fn build_candidate(&mut self, difficulty: DifficultyLevel) -> Result<PatternNotes, GenerationError> {
        let weights = self.weights;
        let base = *weighted_choice(&mut self.rng, self.pool.notes(), |&m| weights.weight_for(m))
            .ok_or(GenerationError::EmptyWeights)?;

        let notes = match difficulty {
            DifficultyLevel::SingleNote => vec![PatternNote::quarter(base, 0)?],
            DifficultyLevel::Interval => {
                let shape = *weighted_choice(&mut self.rng, &INTERVALS, |s| s.weight)
                    .ok_or(GenerationError::EmptyWeights)?;
                let placed = self.place(base, &[0, shape.semitones])?;
                // Melodic: the drawn base sounds first
                let other = if placed[0] == base { placed[1] } else { placed[0] };
                vec![PatternNote::quarter(base, 0)?, PatternNote::quarter(other, 1)?]
            }
            DifficultyLevel::Triad => {
                let shape = *weighted_choice(&mut self.rng, &TRIADS, |s| s.weight)
                    .ok_or(GenerationError::EmptyWeights)?;
                let placed = self.place(base, &[0, shape.offsets[0], shape.offsets[1]])?;
                placed
                    .into_iter()
                    .map(|midi| PatternNote::quarter(midi, 0))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        PatternNotes::from_notes(difficulty, notes)
    }

    /// Lay a shape (offsets from its lowest note) against `base`.
    ///
    /// The shape is stacked upward from `base` unless that leaves the pool's
    /// range, in which case it is stacked so `base` is its top note. Derived
    /// notes snap to the pool unless the pool is chromatic. The result is
    /// sorted ascending and contains `base`.
    fn place(&self, base: u8, shape: &[i16]) -> Result<Vec<u8>, GenerationError> {
        let top = shape.iter().copied().max().unwrap_or(0);
        let highest = self.pool.highest().unwrap_or(MIDI_MAX) as i16;
        let base_i = base as i16;
        let root = if base_i + top <= highest { base_i } else { base_i - top };

        let mut placed = Vec::with_capacity(shape.len());
        for &offset in shape {
            let target = root + offset;
            let midi = if target == base_i {
                base
            } else if self.pool.is_chromatic() {
                if !(0..=MIDI_MAX as i16).contains(&target) {
                    return Err(GenerationError::NoteOutOfRange(target));
                }
                target as u8
            } else {
                self.pool
                    .nearest(target)
                    .ok_or(GenerationError::EmptyPool)?
            };

            if placed.contains(&midi) {
                return Err(GenerationError::DuplicateNotes(midi));
            }
            placed.push(midi);
        }

        placed.sort_unstable();
        Ok(placed)
    }

    fn remember(&mut self, notes: PatternNotes) {
        if self.history_size == 0 {
            return;
        }
        while self.history.len() >= self.history_size {
            self.history.pop_front();
        }
        self.history.push_back(notes);
    }

    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("pattern-{}", self.next_id)
    }
}
