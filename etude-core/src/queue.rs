//! Lookahead pattern queue
//!
//! Keeps a FIFO buffer of pre-generated patterns so the next challenge is
//! always available without paying generation cost. When the buffer runs low
//! the queue asks its [`IdleScheduler`] for background slices and tops itself
//! up while each slice still has time left.
//!
//! Scheduled refill tasks hold only a weak reference to the queue state and the
//! version number current when they were scheduled. Disposing the queue or
//! changing difficulty bumps the version, so a stale task finds a mismatch and
//! does nothing.

use crate::clock::Clock;
use crate::config::{GeneratorConfig, QueueConfig};
use crate::generator::Generator;
use crate::scheduler::{IdleDeadline, IdleScheduler, SliceOutcome, TaskHandle};
use crate::types::difficulty::DifficultyLevel;
use crate::types::pattern::Pattern;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

/// Generation timings kept for the rolling average
const TIMING_WINDOW: usize = 20;

/// Lifecycle of a queue instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum QueueStatus {
    Uninitialized,
    Filled,
    Draining,
    Refilling,
    Disposed,
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueueStatus::Uninitialized => "uninitialized",
            QueueStatus::Filled => "filled",
            QueueStatus::Draining => "draining",
            QueueStatus::Refilling => "refilling",
            QueueStatus::Disposed => "disposed",
        };
        write!(f, "{}", name)
    }
}

/// Point-in-time view of queue health
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueueStats {
    pub status: QueueStatus,
    pub difficulty: DifficultyLevel,
    pub size: usize,
    pub capacity: usize,
    pub generated: u64,
    pub consumed: u64,
    pub average_generation_ms: f64,
    pub last_refill_ms: Option<f64>,
    pub emergency_generations: u64,
    pub fallbacks: u64,
    pub refill_scheduled: bool,
}

struct QueueState {
    generator: Generator,
    clock: Rc<dyn Clock>,
    patterns: VecDeque<Pattern>,
    difficulty: DifficultyLevel,
    capacity: usize,
    refill_threshold: usize,
    status: QueueStatus,
    version: u64,
    task: Option<TaskHandle>,
    generated: u64,
    consumed: u64,
    timings: VecDeque<f64>,
    last_refill_ms: Option<f64>,
    emergency_generations: u64,
}

impl QueueState {
    fn is_disposed(&self) -> bool {
        self.status == QueueStatus::Disposed
    }

    /// Generate one pattern for the current difficulty and record its cost
    fn generate_timed(&mut self) -> Pattern {
        let started = self.clock.now_ms();
        let pattern = self.generator.generate(self.difficulty, started);
        let elapsed = (self.clock.now_ms() - started).max(0.0);

        if self.timings.len() == TIMING_WINDOW {
            self.timings.pop_front();
        }
        self.timings.push_back(elapsed);
        self.generated += 1;
        pattern
    }

    fn fill_to_capacity(&mut self) {
        while self.patterns.len() < self.capacity {
            let pattern = self.generate_timed();
            self.patterns.push_back(pattern);
        }
        self.last_refill_ms = Some(self.clock.now_ms());
    }

    fn average_generation_ms(&self) -> f64 {
        if self.timings.is_empty() {
            0.0
        } else {
            self.timings.iter().sum::<f64>() / self.timings.len() as f64
        }
    }

    fn settle_status(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.status = if self.task.is_some() {
            QueueStatus::Refilling
        } else if self.patterns.len() >= self.capacity {
            QueueStatus::Filled
        } else {
            QueueStatus::Draining
        };
    }
}

/// FIFO buffer of ready patterns with background top-up
pub struct PatternQueue {
    state: Rc<RefCell<QueueState>>,
    scheduler: Rc<dyn IdleScheduler>,
}

impl PatternQueue {
    pub fn new(
        config: &QueueConfig,
        generator: Generator,
        clock: Rc<dyn Clock>,
        scheduler: Rc<dyn IdleScheduler>,
    ) -> Self {
        debug_assert!(config.capacity > 0, "queue capacity must be positive");
        let state = QueueState {
            generator,
            clock,
            patterns: VecDeque::with_capacity(config.capacity),
            difficulty: DifficultyLevel::default(),
            capacity: config.capacity.max(1),
            refill_threshold: config.refill_threshold,
            status: QueueStatus::Uninitialized,
            version: 0,
            task: None,
            generated: 0,
            consumed: 0,
            timings: VecDeque::with_capacity(TIMING_WINDOW),
            last_refill_ms: None,
            emergency_generations: 0,
        };
        PatternQueue {
            state: Rc::new(RefCell::new(state)),
            scheduler,
        }
    }

    /// Synchronously fill the queue for `difficulty`
    pub fn initialize(&mut self, difficulty: DifficultyLevel) {
        self.retarget(difficulty);
        tracing::debug!(
            "Pattern queue initialized with {} {} patterns",
            self.len(),
            difficulty
        );
    }

    /// Discard lookahead and refill synchronously at a new difficulty.
    ///
    /// Any scheduled background refill is cancelled and its callback becomes
    /// a no-op, so no pattern of the old difficulty can be served.
    pub fn change_difficulty(&mut self, difficulty: DifficultyLevel) {
        let previous = self.difficulty();
        self.retarget(difficulty);
        tracing::info!("Pattern queue retargeted from {} to {}", previous, difficulty);
    }

    fn retarget(&mut self, difficulty: DifficultyLevel) {
        self.cancel_refill();
        let mut state = self.state.borrow_mut();
        if state.is_disposed() {
            tracing::warn!("Ignoring retarget of a disposed pattern queue");
            return;
        }
        state.version += 1;
        state.difficulty = difficulty;
        state.patterns.clear();
        state.fill_to_capacity();
        state.settle_status();
    }

    /// Pop the next pattern in generation order.
    ///
    /// An empty queue generates one pattern on the spot. Dropping below the
    /// refill threshold schedules a background refill unless one is pending.
    pub fn get_next(&mut self) -> Pattern {
        let (pattern, needs_refill) = {
            let mut state = self.state.borrow_mut();
            let pattern = match state.patterns.pop_front() {
                Some(pattern) => pattern,
                None => {
                    state.emergency_generations += 1;
                    tracing::warn!(
                        "Pattern queue empty, generating {} pattern synchronously",
                        state.difficulty
                    );
                    state.generate_timed()
                }
            };
            state.consumed += 1;

            let needs_refill = !state.is_disposed()
                && state.task.is_none()
                && state.patterns.len() < state.refill_threshold;
            (pattern, needs_refill)
        };

        if needs_refill {
            self.schedule_refill();
        }
        self.state.borrow_mut().settle_status();
        pattern
    }

    fn schedule_refill(&mut self) {
        let weak = Rc::downgrade(&self.state);
        let version = self.state.borrow().version;
        let handle = self
            .scheduler
            .request_slice(Box::new(move |deadline| refill_slice(&weak, version, deadline)));
        self.state.borrow_mut().task = Some(handle);
        tracing::debug!("Scheduled background refill (version {})", version);
    }

    fn cancel_refill(&mut self) {
        let task = self.state.borrow_mut().task.take();
        if let Some(handle) = task {
            self.scheduler.cancel(handle);
        }
    }

    /// Apply new sizing and generator tuning without discarding lookahead.
    ///
    /// A grown capacity is topped up in the background.
    pub fn reconfigure(&mut self, queue: &QueueConfig, generator: &GeneratorConfig) {
        let needs_refill = {
            let mut state = self.state.borrow_mut();
            state.capacity = queue.capacity.max(1);
            state.refill_threshold = queue.refill_threshold;
            state.generator.reconfigure(generator);
            let capacity = state.capacity;
            state.patterns.truncate(capacity);
            state.status != QueueStatus::Uninitialized
                && !state.is_disposed()
                && state.task.is_none()
                && state.patterns.len() < state.capacity
        };

        if needs_refill {
            self.schedule_refill();
        }
        self.state.borrow_mut().settle_status();
    }

    /// Cancel background work and refuse further refills
    pub fn dispose(&mut self) {
        self.cancel_refill();
        let mut state = self.state.borrow_mut();
        if state.is_disposed() {
            return;
        }
        state.version += 1;
        state.patterns.clear();
        state.status = QueueStatus::Disposed;
        tracing::debug!("Pattern queue disposed");
    }

    pub fn len(&self) -> usize {
        self.state.borrow().patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn difficulty(&self) -> DifficultyLevel {
        self.state.borrow().difficulty
    }

    pub fn status(&self) -> QueueStatus {
        self.state.borrow().status
    }

    /// Difficulties of the queued patterns, head first
    pub fn queued_difficulties(&self) -> Vec<DifficultyLevel> {
        self.state
            .borrow()
            .patterns
            .iter()
            .map(|p| p.difficulty())
            .collect()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.state.borrow();
        QueueStats {
            status: state.status,
            difficulty: state.difficulty,
            size: state.patterns.len(),
            capacity: state.capacity,
            generated: state.generated,
            consumed: state.consumed,
            average_generation_ms: state.average_generation_ms(),
            last_refill_ms: state.last_refill_ms,
            emergency_generations: state.emergency_generations,
            fallbacks: state.generator.fallback_count(),
            refill_scheduled: state.task.is_some(),
        }
    }
}

impl Drop for PatternQueue {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// One background slice: top up while the deadline allows
fn refill_slice(
    weak: &Weak<RefCell<QueueState>>,
    version: u64,
    deadline: &IdleDeadline<'_>,
) -> SliceOutcome {
    let Some(state) = weak.upgrade() else {
        return SliceOutcome::Done;
    };
    let mut state = state.borrow_mut();
    if state.is_disposed() || state.version != version {
        return SliceOutcome::Done;
    }

    let mut produced = 0;
    while state.patterns.len() < state.capacity && !deadline.is_expired() {
        let pattern = state.generate_timed();
        state.patterns.push_back(pattern);
        produced += 1;
    }

    if state.patterns.len() >= state.capacity {
        state.task = None;
        state.last_refill_ms = Some(state.clock.now_ms());
        state.settle_status();
        tracing::debug!("Background refill complete (+{} patterns)", produced);
        SliceOutcome::Done
    } else {
        tracing::debug!(
            "Refill slice out of budget after {} patterns, {} queued",
            produced,
            state.patterns.len()
        );
        SliceOutcome::Continue
    }
}
