//! # Etude
//!
//! Terminal host for the `etude-core` practice engine. A REPL drives a
//! session from typed note names or a live MIDI keyboard, previews patterns
//! through the default audio device, saves sessions to JSON and reloads its
//! configuration when the file changes.
//!
//! ## Modules
//!
//! - `repl`: the event loop tying input, MIDI, idle ticks and file watching
//!   together on one thread
//! - `commands`: the command registry and its handlers
//! - `midi`: MIDI input over midir
//! - `audio`: pattern preview over cpal
//! - `runtime`: the idle ticker that paces background queue refills
//! - `store`: JSON file session store

pub mod audio;
pub mod commands;
pub mod midi;
pub mod repl;
pub mod runtime;
pub mod store;

use anyhow::{Context, Result};
use etude_core::EngineConfig;
use std::fs;
use std::path::Path;

pub use etude_core;
pub use repl::{start, Repl, ReplOptions};
pub use store::JsonFileStore;

/// Read and validate a JSON engine configuration
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    EngineConfig::from_json_str(&json)
        .with_context(|| format!("Invalid configuration in {}", path.display()))
}
