//! Cooperative idle-time scheduling
//!
//! The engine never spawns threads. Work that can wait (queue refills) is
//! handed to an [`IdleScheduler`] as a task that is run in short slices, each
//! bounded by an [`IdleDeadline`]. A task reports whether it wants another
//! slice; the host decides when slices happen by pumping
//! [`CooperativeScheduler::run_slice`] (from a browser idle callback, a timer
//! thread, or directly in tests).

use crate::clock::Clock;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Time budget of the slice a task is running in
pub struct IdleDeadline<'a> {
    clock: &'a dyn Clock,
    deadline_ms: f64,
}

impl<'a> IdleDeadline<'a> {
    pub fn new(clock: &'a dyn Clock, deadline_ms: f64) -> Self {
        IdleDeadline { clock, deadline_ms }
    }

    /// Milliseconds left in this slice, never negative
    pub fn time_remaining(&self) -> f64 {
        (self.deadline_ms - self.clock.now_ms()).max(0.0)
    }

    pub fn is_expired(&self) -> bool {
        self.time_remaining() <= 0.0
    }
}

/// What a task wants after a slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceOutcome {
    /// Finished; drop the task
    Done,
    /// Out of budget; run again in a later slice
    Continue,
}

pub type IdleTask = Box<dyn FnMut(&IdleDeadline<'_>) -> SliceOutcome>;

/// Identifies a scheduled task for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

/// Yield-point capability the queue requests background time from
pub trait IdleScheduler {
    fn request_slice(&self, task: IdleTask) -> TaskHandle;
    fn cancel(&self, handle: TaskHandle);
}

struct SchedulerState {
    next_id: u64,
    tasks: VecDeque<(TaskHandle, IdleTask)>,
    running: Option<TaskHandle>,
    cancel_running: bool,
}

/// Single-threaded scheduler pumped by the host
pub struct CooperativeScheduler {
    clock: Rc<dyn Clock>,
    state: RefCell<SchedulerState>,
}

impl CooperativeScheduler {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        CooperativeScheduler {
            clock,
            state: RefCell::new(SchedulerState {
                next_id: 0,
                tasks: VecDeque::new(),
                running: None,
                cancel_running: false,
            }),
        }
    }

    /// Number of tasks waiting for a slice
    pub fn pending(&self) -> usize {
        self.state.borrow().tasks.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Run queued tasks until `budget_ms` elapses.
    ///
    /// Each task queued at entry runs at most once; tasks asking to continue
    /// go to the back of the queue. Returns the number of tasks that ran.
    pub fn run_slice(&self, budget_ms: f64) -> usize {
        let deadline_ms = self.clock.now_ms() + budget_ms.max(0.0);
        let deadline = IdleDeadline::new(self.clock.as_ref(), deadline_ms);
        let queued = self.pending();
        let mut ran = 0;

        for _ in 0..queued {
            if deadline.is_expired() {
                break;
            }

            let next = {
                let mut state = self.state.borrow_mut();
                let next = state.tasks.pop_front();
                if let Some((handle, _)) = &next {
                    state.running = Some(*handle);
                    state.cancel_running = false;
                }
                next
            };
            let Some((handle, mut task)) = next else {
                break;
            };

            // No borrow is held while the task runs, so it may schedule or cancel
            let outcome = task(&deadline);
            ran += 1;

            let mut state = self.state.borrow_mut();
            let cancelled = state.cancel_running;
            state.running = None;
            state.cancel_running = false;
            if outcome == SliceOutcome::Continue && !cancelled {
                state.tasks.push_back((handle, task));
            }
        }

        ran
    }
}

impl IdleScheduler for CooperativeScheduler {
    fn request_slice(&self, task: IdleTask) -> TaskHandle {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let handle = TaskHandle(state.next_id);
        state.tasks.push_back((handle, task));
        handle
    }

    fn cancel(&self, handle: TaskHandle) {
        let mut state = self.state.borrow_mut();
        if state.running == Some(handle) {
            state.cancel_running = true;
        }
        state.tasks.retain(|(h, _)| *h != handle);
    }
}
