//! Millisecond time sources
//!
//! The engine never reads wall-clock time directly. Pattern timestamps, refill
//! deadlines and generation timings all go through a [`Clock`] so hosts can
//! supply their own (`performance.now()` in a browser, a manual clock in tests).

use std::cell::Cell;

/// Monotonic millisecond clock
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Milliseconds elapsed since the clock was created
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        ManualClock {
            now: Cell::new(start_ms),
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100.0);
        assert_eq!(clock.now_ms(), 100.0);
        clock.advance(25.5);
        assert_eq!(clock.now_ms(), 125.5);
        clock.set(0.0);
        assert_eq!(clock.now_ms(), 0.0);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(a >= 0.0);
        assert!(b >= a);
    }
}
