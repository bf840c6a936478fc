//! Command registry for REPL commands
//!
//! Commands are matched by longest prefix. Input that matches no command is
//! handed back as [`CommandResult::NotACommand`] and the REPL treats it as
//! played notes.

pub mod general;
pub mod midi;
pub mod practice;

use crate::audio::PreviewPlayer;
use crate::midi::MidiInputHandle;
use crate::store::JsonFileStore;
use crossbeam_channel::Sender;
use etude_core::clock::SystemClock;
use etude_core::{MidiEvent, PracticeEngine};
use std::path::PathBuf;

/// Result of executing a command
#[derive(Debug)]
pub enum CommandResult {
    /// Command executed successfully, continue REPL
    Success,
    /// Command executed, show this message
    Message(String),
    /// Exit the REPL
    Exit,
    /// Not a command, try reading the input as notes
    NotACommand,
    /// Error occurred
    Error(String),
    /// Watch a configuration file for changes
    Watch(String),
}

/// Context passed to command handlers
pub struct CommandContext {
    pub engine: PracticeEngine,
    pub midi: MidiInputHandle,
    /// Where connected MIDI ports deliver their events
    pub midi_tx: Sender<MidiEvent>,
    /// Opened on first use; hosts without an output device never open it
    pub preview: Option<PreviewPlayer>,
    pub store_path: Option<PathBuf>,
    /// Config file most recently loaded, if any
    pub config_path: Option<PathBuf>,
}

impl CommandContext {
    /// `clock` must be the clock the engine was built with
    pub fn new(engine: PracticeEngine, clock: SystemClock, midi_tx: Sender<MidiEvent>) -> Self {
        Self {
            engine,
            midi: MidiInputHandle::new(clock),
            midi_tx,
            preview: None,
            store_path: None,
            config_path: None,
        }
    }

    /// Route session records to a JSON file from now on
    pub fn use_store(&mut self, path: PathBuf) {
        self.engine
            .set_store(Some(Box::new(JsonFileStore::new(path.clone()))));
        self.store_path = Some(path);
    }

    /// The preview player, opening the audio device on first use
    pub fn preview(&mut self) -> anyhow::Result<&mut PreviewPlayer> {
        if self.preview.is_none() {
            self.preview = Some(PreviewPlayer::new()?);
        }
        self.preview
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Audio preview unavailable"))
    }
}

/// A command handler function
pub type CommandHandler = fn(&str, &mut CommandContext) -> CommandResult;

/// Registry of available commands
pub struct CommandRegistry {
    /// Sorted by prefix length descending for longest-match-first lookup
    commands: Vec<(String, CommandHandler)>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn register(&mut self, prefix: &str, handler: CommandHandler) {
        self.commands.push((prefix.to_string(), handler));
        self.commands.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    /// Execute a command, returning NotACommand if no match found
    pub fn execute(&self, input: &str, ctx: &mut CommandContext) -> CommandResult {
        for (prefix, handler) in &self.commands {
            if input == prefix || input.starts_with(&format!("{} ", prefix)) {
                let args = input[prefix.len()..].trim();
                return handler(args, ctx);
            }
        }
        CommandResult::NotACommand
    }

    pub fn list_commands(&self) -> Vec<&str> {
        self.commands.iter().map(|(p, _)| p.as_str()).collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a fully populated command registry with all built-in commands
pub fn create_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();

    // Practice session
    registry.register("start", practice::cmd_start);
    registry.register("next", practice::cmd_next);
    registry.register("skip", practice::cmd_next);
    registry.register("retry", practice::cmd_retry);
    registry.register("play", practice::cmd_play);
    registry.register("listen", practice::cmd_listen);
    registry.register("notation", practice::cmd_notation);
    registry.register("difficulty", practice::cmd_difficulty);
    registry.register("adaptive", practice::cmd_adaptive);
    registry.register("reset", practice::cmd_reset);

    // Analytics and persistence
    registry.register("summary", practice::cmd_summary);
    registry.register("progress", practice::cmd_progress);
    registry.register("problems", practice::cmd_problems);
    registry.register("stats", practice::cmd_stats);
    registry.register("save", practice::cmd_save);
    registry.register("export", practice::cmd_export);
    registry.register("import", practice::cmd_import);

    // MIDI input
    registry.register("midi devices", midi::cmd_midi_devices);
    registry.register("midi connect", midi::cmd_midi_connect);
    registry.register("midi disconnect", midi::cmd_midi_disconnect);
    registry.register("midi status", midi::cmd_midi_status);

    // General commands
    registry.register("config", general::cmd_config);
    registry.register("tempo", general::cmd_tempo);
    registry.register("help", general::cmd_help);
    registry.register("quit", general::cmd_quit);
    registry.register("exit", general::cmd_quit);
    registry.register("watch", general::cmd_watch);

    registry
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_prefix_wins() {
        let registry = create_registry();
        let mut ctx = test_support::context();
        // "midi status" must not be read as an unknown "midi" command
        match registry.execute("midi status", &mut ctx) {
            CommandResult::Message(msg) => assert!(msg.contains("MIDI")),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_prefix_needs_word_boundary() {
        let registry = create_registry();
        let mut ctx = test_support::context();
        assert!(matches!(
            registry.execute("restart", &mut ctx),
            CommandResult::NotACommand
        ));
        assert!(matches!(
            registry.execute("C E G", &mut ctx),
            CommandResult::NotACommand
        ));
    }

    #[test]
    fn test_quit_and_exit() {
        let registry = create_registry();
        let mut ctx = test_support::context();
        assert!(matches!(registry.execute("quit", &mut ctx), CommandResult::Exit));
        assert!(matches!(registry.execute("exit", &mut ctx), CommandResult::Exit));
    }

    #[test]
    fn test_watch_requires_path() {
        let registry = create_registry();
        let mut ctx = test_support::context();
        assert!(matches!(
            registry.execute("watch", &mut ctx),
            CommandResult::Error(_)
        ));
        match registry.execute("watch etude.json", &mut ctx) {
            CommandResult::Watch(path) => assert_eq!(path, "etude.json"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_list_commands_sorted_longest_first() {
        let registry = create_registry();
        let commands = registry.list_commands();
        assert!(commands.windows(2).all(|w| w[0].len() >= w[1].len()));
        assert!(commands.contains(&"midi connect"));
    }
}
