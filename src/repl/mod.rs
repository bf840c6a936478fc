//! Terminal practice REPL
//!
//! One thread owns the engine. Typed input, MIDI notes, idle ticks and
//! config file changes all arrive on crossbeam channels and are handled in
//! a single `select!` loop, so the engine never needs locking.

use crate::commands::practice::{on_note, parse_notes, play_notes};
use crate::commands::{create_registry, CommandContext, CommandRegistry, CommandResult};
use crate::load_config;
use crate::repl::watcher::ConfigWatcher;
use crate::runtime::{IdleTick, IdleTicker};
use anyhow::{anyhow, Result};
use colored::*;
use crossbeam_channel::{unbounded, Receiver, Sender};
use etude_core::clock::SystemClock;
use etude_core::{DifficultyLevel, EngineConfig, MidiEvent, PracticeEngine};
use notify::Event;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;

pub mod watcher;

/// Types of events the REPL loop handles
enum ReplEvent {
    Input(Result<String, ReadlineError>),
}

/// Startup choices made on the command line
#[derive(Debug, Clone, Default)]
pub struct ReplOptions {
    pub config: EngineConfig,
    pub config_path: Option<PathBuf>,
    pub watch_config: bool,
    pub store_path: Option<PathBuf>,
    pub difficulty: Option<DifficultyLevel>,
    pub midi_port: Option<String>,
}

/// Whether the loop should keep going after an input line
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Interactive practice REPL
pub struct Repl {
    editor: Option<DefaultEditor>,
    ctx: CommandContext,
    registry: CommandRegistry,
    ticker: IdleTicker,

    // Event channels
    tx_input: Sender<ReplEvent>,
    rx_input: Receiver<ReplEvent>,
    rx_midi: Receiver<MidiEvent>,
    rx_tick: Receiver<IdleTick>,
    tx_watcher: Sender<notify::Result<Event>>,
    rx_watcher: Receiver<notify::Result<Event>>,

    watcher: Option<ConfigWatcher>,
}

impl Repl {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let editor =
            DefaultEditor::new().map_err(|e| anyhow!("Failed to create line editor: {}", e))?;

        // MIDI events are stamped on the same timebase as the engine
        let clock = SystemClock::new();
        let engine = PracticeEngine::with_clock(config, Rc::new(clock))?;

        let (tx_input, rx_input) = unbounded();
        let (tx_midi, rx_midi) = unbounded();
        let (tx_watcher, rx_watcher) = unbounded();

        let ticker = IdleTicker::default();
        let rx_tick = ticker.subscribe();

        Ok(Repl {
            editor: Some(editor),
            ctx: CommandContext::new(engine, clock, tx_midi),
            registry: create_registry(),
            ticker,
            tx_input,
            rx_input,
            rx_midi,
            rx_tick,
            tx_watcher,
            rx_watcher,
            watcher: None,
        })
    }

    pub fn context(&self) -> &CommandContext {
        &self.ctx
    }

    /// Apply command line options that need a live REPL
    fn apply_options(&mut self, options: &ReplOptions) {
        if let Some(path) = &options.store_path {
            self.ctx.use_store(path.clone());
        }
        if let Some(path) = &options.config_path {
            self.ctx.config_path = Some(path.clone());
            if options.watch_config {
                self.watch(&path.to_string_lossy());
            }
        }
        if let Some(port) = &options.midi_port {
            let tx = self.ctx.midi_tx.clone();
            match self.ctx.midi.connect(port, tx) {
                Ok(name) => println!("🎹 Listening to MIDI port: {}", name.green()),
                Err(e) => println!("{} {}", "MIDI error:".red(), e),
            }
        }
    }

    fn watch(&mut self, path: &str) {
        if self.watcher.is_none() {
            match ConfigWatcher::new(self.tx_watcher.clone()) {
                Ok(w) => self.watcher = Some(w),
                Err(e) => println!("{} Failed to create watcher: {}", "Error:".red(), e),
            }
        }

        if let Some(w) = &mut self.watcher {
            match w.watch(path) {
                Ok(target) => {
                    self.ctx.config_path = Some(target);
                    println!(
                        "{} Watching {} for changes...",
                        "👀".bright_cyan(),
                        path.bright_green()
                    );
                }
                Err(e) => println!("{} Failed to watch {}: {}", "Error:".red(), path, e),
            }
        }
    }

    /// Execute one input line
    fn handle_line(&mut self, line: &str) -> Flow {
        if line.is_empty() {
            return Flow::Continue;
        }

        match self.registry.execute(line, &mut self.ctx) {
            CommandResult::Success => {}
            CommandResult::Message(msg) => println!("{}", msg),
            CommandResult::Exit => return Flow::Exit,
            CommandResult::Error(e) => println!("{} {}", "Error:".bright_red().bold(), e.red()),
            CommandResult::Watch(path) => self.watch(&path),
            CommandResult::NotACommand => match parse_notes(line) {
                Ok(notes) => println!("{}", play_notes(&mut self.ctx, &notes)),
                Err(e) => println!(
                    "{} {} (type '{}' for commands)",
                    "Not a command or note:".bright_red().bold(),
                    e.to_string().red(),
                    "help".bright_green()
                ),
            },
        }
        Flow::Continue
    }

    fn handle_midi(&mut self, event: MidiEvent) {
        if event.is_playable() {
            println!("{}", on_note(&mut self.ctx, event.note, event.timestamp_ms));
        }
    }

    /// Spend the tick's budget on queued background work
    fn handle_tick(&mut self, tick: IdleTick) {
        // A slow iteration leaves stale ticks behind; one slice covers them
        let skipped = self.rx_tick.try_iter().count();
        if self.ctx.engine.has_pending_work() {
            let ran = self.ctx.engine.run_idle(tick.budget_ms);
            tracing::trace!("Idle tick {} ran {} tasks ({} skipped)", tick.sequence, ran, skipped);
        }
    }

    fn reload_config(&mut self, path: &Path) {
        match load_config(path) {
            Ok(config) if &config == self.ctx.engine.config() => {}
            Ok(config) => match self.ctx.engine.apply_config(config) {
                Ok(()) => println!("{} Reloaded {}", "✓".bright_green(), path.display()),
                Err(e) => println!("{} {}", "Config error:".red(), e),
            },
            Err(e) => println!("{} {:#}", "Config error:".red(), e),
        }
    }

    fn handle_watch_event(&mut self, event: Event) {
        let changed = self
            .watcher
            .as_ref()
            .and_then(|w| w.changed_target(&event))
            .map(Path::to_path_buf);
        if let Some(path) = changed {
            println!("{} File changed: {}", "⚡".bright_yellow(), path.display());
            self.reload_config(&path);
        }
    }

    /// Save on the way out when a store is configured
    fn shutdown(&mut self) {
        self.ticker.stop();
        self.ctx.midi.disconnect();
        if self.ctx.store_path.is_some() {
            self.ctx.engine.persist();
        }
        println!("{} 🎹", "Goodbye!".bright_cyan());
    }

    /// Start the REPL loop
    pub fn run(&mut self) -> Result<()> {
        println!(
            "{} {}",
            "🎹".bright_yellow(),
            "Etude Adaptive Practice".bright_cyan().bold()
        );
        println!(
            "Type '{}' to begin, then play notes like {} or {}.",
            "start".bright_green(),
            "C".cyan(),
            "C E G".cyan()
        );
        println!(
            "Type '{}' for more information, '{}' or {} to exit.\n",
            "help".bright_green(),
            "quit".bright_red(),
            "Ctrl+C".bright_red()
        );

        let mut editor = self
            .editor
            .take()
            .ok_or_else(|| anyhow!("REPL is already running"))?;
        let tx_input = self.tx_input.clone();

        thread::spawn(move || loop {
            let prompt = format!("{} ", "etude>".bright_magenta().bold());
            match editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if !line.is_empty() {
                        let _ = editor.add_history_entry(&line);
                    }
                    if tx_input.send(ReplEvent::Input(Ok(line))).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    let _ = tx_input.send(ReplEvent::Input(Err(err)));
                    break;
                }
            }
        });

        self.ticker.start();

        loop {
            crossbeam_channel::select! {
                recv(self.rx_input) -> msg => match msg {
                    Ok(ReplEvent::Input(Ok(line))) => {
                        if self.handle_line(&line) == Flow::Exit {
                            break;
                        }
                    }
                    Ok(ReplEvent::Input(Err(ReadlineError::Interrupted)))
                    | Ok(ReplEvent::Input(Err(ReadlineError::Eof))) => break,
                    Ok(ReplEvent::Input(Err(err))) => {
                        println!(
                            "{} {}",
                            "Error reading input:".bright_red().bold(),
                            err.to_string().red()
                        );
                        break;
                    }
                    Err(_) => break, // Channel closed
                },

                recv(self.rx_midi) -> msg => {
                    if let Ok(event) = msg {
                        self.handle_midi(event);
                    }
                },

                recv(self.rx_tick) -> msg => {
                    if let Ok(tick) = msg {
                        self.handle_tick(tick);
                    }
                },

                recv(self.rx_watcher) -> msg => match msg {
                    Ok(Ok(event)) => self.handle_watch_event(event),
                    Ok(Err(e)) => println!("{} Watch error: {}", "Error:".red(), e),
                    Err(_) => {}
                },
            }
        }

        self.shutdown();
        Ok(())
    }
}

/// Convenience function to start the REPL
pub fn start(options: ReplOptions) -> Result<()> {
    let mut repl = Repl::new(options.config.clone())?;
    repl.apply_options(&options);
    if let Some(level) = options.difficulty {
        repl.handle_line(&format!("start {}", level));
    }
    repl.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use etude_core::PatternOutcome;

    fn seeded_repl() -> Repl {
        let mut config = EngineConfig::default();
        config.generator.seed = Some(3);
        Repl::new(config).unwrap()
    }

    #[test]
    fn test_repl_creation() {
        let result = Repl::new(EngineConfig::default());
        assert!(result.is_ok());
    }

    #[test]
    fn test_quit_exits() {
        let mut repl = seeded_repl();
        assert_eq!(repl.handle_line("quit"), Flow::Exit);
        assert_eq!(repl.handle_line(""), Flow::Continue);
    }

    #[test]
    fn test_typed_notes_are_validated() {
        let mut repl = seeded_repl();
        repl.handle_line("start single");
        let pattern = repl.context().engine.current_pattern().unwrap().clone();
        let name = etude_core::types::note::midi_name(pattern.midi_notes()[0]);

        assert_eq!(repl.handle_line(&name), Flow::Continue);
        assert_eq!(repl.context().engine.session_summary().total_attempts, 1);
        assert_ne!(
            repl.context().engine.current_pattern().unwrap().id(),
            pattern.id()
        );
    }

    #[test]
    fn test_midi_note_off_is_ignored() {
        let mut repl = seeded_repl();
        repl.handle_line("start interval");
        let pattern = repl.context().engine.current_pattern().unwrap().clone();
        let first = pattern.midi_notes()[0];

        repl.handle_midi(MidiEvent::note_off(first, 10.0));
        assert_eq!(repl.context().engine.note_stats().total_notes, 0);

        repl.handle_midi(MidiEvent::note_on(first, 90, 20.0));
        assert_eq!(repl.context().engine.note_stats().total_notes, 1);
        assert_eq!(repl.context().engine.outcome(), PatternOutcome::Pending);
    }

    #[test]
    fn test_tick_runs_background_refill() {
        let mut repl = seeded_repl();
        repl.handle_line("start single");
        for _ in 0..8 {
            repl.handle_line("next");
        }
        assert!(repl.context().engine.has_pending_work());

        for sequence in 0..4 {
            repl.handle_tick(IdleTick {
                sequence,
                budget_ms: 50.0,
                timestamp: std::time::Instant::now(),
            });
        }
        let stats = repl.context().engine.queue_stats();
        assert_eq!(stats.size, stats.capacity);
        assert!(!repl.context().engine.has_pending_work());
    }

    #[test]
    fn test_tick_flushes_session_to_store() {
        let path = std::env::temp_dir().join(format!("etude-flush-{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let mut repl = seeded_repl();
        repl.ctx.use_store(path.clone());
        repl.handle_line("start single");
        let pattern = repl.context().engine.current_pattern().unwrap().clone();
        repl.handle_line(&etude_core::types::note::midi_name(pattern.midi_notes()[0]));
        assert!(!path.exists());

        repl.handle_tick(IdleTick {
            sequence: 0,
            budget_ms: 50.0,
            timestamp: std::time::Instant::now(),
        });
        let records = crate::JsonFileStore::new(&path).load_all().unwrap();
        let record = records.values().next().unwrap();
        assert_eq!(record.summary.total_attempts, 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_reload_config_applies_changes() {
        let path = std::env::temp_dir().join(format!("etude-reload-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "adaptive_difficulty": true }"#).unwrap();

        let mut repl = seeded_repl();
        assert!(!repl.context().engine.is_adaptive());
        repl.reload_config(&path);
        assert!(repl.context().engine.is_adaptive());

        std::fs::write(&path, "{ broken").unwrap();
        repl.reload_config(&path);
        assert!(repl.context().engine.is_adaptive());
        let _ = std::fs::remove_file(&path);
    }
}
