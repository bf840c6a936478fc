//! Idle ticker
//!
//! A terminal has no idle callback, so a small thread stands in for one: it
//! broadcasts [`IdleTick`]s at a fixed interval and the REPL loop spends a
//! bounded slice of each tick on the engine's background work.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default spacing between ticks
pub const DEFAULT_INTERVAL_MS: u64 = 16;

/// Default share of each tick handed to background work
pub const DEFAULT_BUDGET_MS: f64 = 8.0;

/// One idle opportunity
#[derive(Clone, Debug)]
pub struct IdleTick {
    /// Ticks emitted since the ticker was created
    pub sequence: u64,
    /// Milliseconds of work the receiver may spend on this tick
    pub budget_ms: f64,
    pub timestamp: Instant,
}

#[derive(Debug)]
enum TickerCommand {
    Start,
    Stop,
    AddSubscriber(Sender<IdleTick>),
    Shutdown,
}

/// Handle to the ticker thread; dropping it stops the thread
pub struct IdleTicker {
    interval_ms: Arc<AtomicU64>,
    budget_bits: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    command_tx: Sender<TickerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl IdleTicker {
    pub fn new(interval_ms: u64, budget_ms: f64) -> Self {
        let interval_ms = Arc::new(AtomicU64::new(interval_ms.max(1)));
        let budget_bits = Arc::new(AtomicU64::new(budget_ms.max(0.0).to_bits()));
        let running = Arc::new(AtomicBool::new(false));
        let (command_tx, command_rx) = crossbeam_channel::bounded(64);

        let worker = TickerThread {
            interval_ms: interval_ms.clone(),
            budget_bits: budget_bits.clone(),
            running: running.clone(),
            command_rx,
            subscribers: Vec::new(),
            sequence: 0,
        };
        let thread = thread::spawn(move || worker.run());

        IdleTicker {
            interval_ms,
            budget_bits,
            running,
            command_tx,
            thread: Some(thread),
        }
    }

    /// New receiver of ticks; every subscriber sees every tick
    pub fn subscribe(&self) -> Receiver<IdleTick> {
        let (tx, rx) = unbounded();
        let _ = self.command_tx.send(TickerCommand::AddSubscriber(tx));
        rx
    }

    pub fn start(&self) {
        let _ = self.command_tx.send(TickerCommand::Start);
    }

    pub fn stop(&self) {
        let _ = self.command_tx.send(TickerCommand::Stop);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.load(Ordering::Relaxed)
    }

    pub fn set_interval_ms(&self, interval_ms: u64) {
        self.interval_ms.store(interval_ms.max(1), Ordering::Relaxed);
    }

    pub fn budget_ms(&self) -> f64 {
        f64::from_bits(self.budget_bits.load(Ordering::Relaxed))
    }

    pub fn set_budget_ms(&self, budget_ms: f64) {
        self.budget_bits
            .store(budget_ms.max(0.0).to_bits(), Ordering::Relaxed);
    }
}

impl Default for IdleTicker {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL_MS, DEFAULT_BUDGET_MS)
    }
}

impl Drop for IdleTicker {
    fn drop(&mut self) {
        let _ = self.command_tx.send(TickerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

struct TickerThread {
    interval_ms: Arc<AtomicU64>,
    budget_bits: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    command_rx: Receiver<TickerCommand>,
    subscribers: Vec<Sender<IdleTick>>,
    sequence: u64,
}

impl TickerThread {
    fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    fn run(mut self) {
        let mut next_tick = Instant::now();

        loop {
            if self.running.load(Ordering::Relaxed) {
                let wait = next_tick.saturating_duration_since(Instant::now());
                match self.command_rx.recv_timeout(wait) {
                    Ok(cmd) => {
                        let was_running = self.running.load(Ordering::Relaxed);
                        if self.handle_command(cmd) {
                            break;
                        }
                        if !was_running {
                            next_tick = Instant::now();
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        self.emit_tick();
                        // Skip missed ticks instead of bursting to catch up
                        next_tick = (next_tick + self.interval()).max(Instant::now());
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            } else {
                match self.command_rx.recv() {
                    Ok(cmd) => {
                        if self.handle_command(cmd) {
                            break;
                        }
                        if self.running.load(Ordering::Relaxed) {
                            next_tick = Instant::now();
                        }
                    }
                    Err(_) => break,
                }
            }
        }
        tracing::debug!("Idle ticker stopped after {} ticks", self.sequence);
    }

    /// Returns true on shutdown
    fn handle_command(&mut self, cmd: TickerCommand) -> bool {
        match cmd {
            TickerCommand::Start => self.running.store(true, Ordering::Relaxed),
            TickerCommand::Stop => self.running.store(false, Ordering::Relaxed),
            TickerCommand::AddSubscriber(tx) => self.subscribers.push(tx),
            TickerCommand::Shutdown => {
                self.running.store(false, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    fn emit_tick(&mut self) {
        let tick = IdleTick {
            sequence: self.sequence,
            budget_ms: f64::from_bits(self.budget_bits.load(Ordering::Relaxed)),
            timestamp: Instant::now(),
        };
        self.sequence += 1;
        self.subscribers.retain(|tx| tx.send(tick.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_creation() {
        let ticker = IdleTicker::new(5, 2.0);
        assert!(!ticker.is_running());
        assert_eq!(ticker.interval_ms(), 5);
        assert_eq!(ticker.budget_ms(), 2.0);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let ticker = IdleTicker::new(0, -1.0);
        assert_eq!(ticker.interval_ms(), 1);
        assert_eq!(ticker.budget_ms(), 0.0);
    }

    #[test]
    fn test_ticks_arrive_in_sequence() {
        let ticker = IdleTicker::new(2, 1.5);
        let rx = ticker.subscribe();
        ticker.start();

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first.sequence + 1, second.sequence);
        assert_eq!(first.budget_ms, 1.5);
        assert!(second.timestamp >= first.timestamp);
    }

    #[test]
    fn test_stopped_ticker_is_silent() {
        let ticker = IdleTicker::new(2, 1.0);
        let rx = ticker.subscribe();
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        ticker.start();
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
        ticker.stop();
        thread::sleep(Duration::from_millis(30));
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        assert!(!ticker.is_running());
    }

    #[test]
    fn test_drop_closes_subscribers() {
        let ticker = IdleTicker::new(2, 1.0);
        let rx = ticker.subscribe();
        ticker.start();
        drop(ticker);
        while rx.try_recv().is_ok() {}
        assert!(rx.recv().is_err());
    }
}
