//! General REPL commands (help, quit, config, tempo, watch)

use crate::commands::{CommandContext, CommandResult};
use crate::load_config;
use colored::*;
use std::path::PathBuf;

/// Handle `help` command
pub fn cmd_help(_args: &str, _ctx: &mut CommandContext) -> CommandResult {
    print_help();
    CommandResult::Success
}

/// Handle `quit` or `exit` command
pub fn cmd_quit(_args: &str, _ctx: &mut CommandContext) -> CommandResult {
    CommandResult::Exit
}

/// Handle `config [path]`: show the active configuration or load a file
pub fn cmd_config(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return match ctx.engine.config().to_json_string() {
            Ok(json) => CommandResult::Message(json),
            Err(e) => CommandResult::Error(e.to_string()),
        };
    }

    let path = PathBuf::from(args);
    match load_config(&path).and_then(|config| Ok(ctx.engine.apply_config(config)?)) {
        Ok(()) => {
            ctx.config_path = Some(path);
            CommandResult::Message(
                format!("⚙️  Loaded configuration from {}", args)
                    .bright_green()
                    .to_string(),
            )
        }
        Err(e) => CommandResult::Error(format!("{:#}", e)),
    }
}

/// Handle `tempo [bpm]` - preview playback speed
pub fn cmd_tempo(args: &str, ctx: &mut CommandContext) -> CommandResult {
    let current = ctx
        .preview
        .as_ref()
        .map(|p| p.bpm())
        .unwrap_or(crate::audio::preview::DEFAULT_BPM);
    if args.is_empty() {
        return CommandResult::Message(format!("Preview tempo: {:.1} BPM", current));
    }

    match args.parse::<f64>() {
        Ok(bpm) if bpm > 0.0 && bpm <= 400.0 => match ctx.preview() {
            Ok(player) => {
                player.set_bpm(bpm);
                CommandResult::Message(
                    format!("🎵 Preview tempo set to {:.1} BPM", bpm)
                        .bright_green()
                        .to_string(),
                )
            }
            Err(e) => CommandResult::Error(format!("Audio preview failed: {}", e)),
        },
        _ => CommandResult::Error("Invalid tempo. Use a value between 1-400 BPM".to_string()),
    }
}

/// Handle `watch [file]` command
pub fn cmd_watch(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Error("Usage: watch <config.json>".to_string());
    }
    CommandResult::Watch(args.to_string())
}

/// Print help information
fn print_help() {
    println!("{}", "🎹 Etude Help".bold());
    println!("{}", "============".bold());
    println!();
    println!("{}", "Practice:".green());
    println!("  {}   - Start a session (single, interval, triad)", "start [level]".cyan());
    println!("  {}    - Validate typed notes against the pattern", "C E G".cyan());
    println!("  {} - Same, as an explicit command", "play <notes>".cyan());
    println!("  {}           - Skip to the next pattern", "next".cyan());
    println!("  {}          - Try the current pattern again", "retry".cyan());
    println!("  {}         - Hear the current pattern", "listen".cyan());
    println!("  {}       - Print the pattern as MusicXML", "notation".cyan());
    println!("  {} - Show or change difficulty", "difficulty [level]".cyan());
    println!("  {} - Toggle automatic level-ups", "adaptive [on|off]".cyan());
    println!("  {}          - Start over at the starting level", "reset".cyan());
    println!();
    println!("{}", "Analytics:".green());
    println!("  {}        - Accuracy, strengths and advice", "summary".cyan());
    println!("  {}  - Improvement on one pattern", "progress [id]".cyan());
    println!("  {}       - Weak patterns and notes", "problems".cyan());
    println!("  {}          - Queue and note statistics", "stats".cyan());
    println!("  {}   - Save the session to a JSON file", "save [file]".cyan());
    println!("  {} - Write analytics to a file", "export <file>".cyan());
    println!("  {} - Load analytics from a file", "import <file>".cyan());
    println!();
    println!("{}", "MIDI Input:".green());
    println!("  {}   - List MIDI input ports", "midi devices".cyan());
    println!("  {} - Listen to a port", "midi connect <port>".cyan());
    println!("  {} - Stop listening", "midi disconnect".cyan());
    println!("  {}    - Show MIDI status", "midi status".cyan());
    println!();
    println!("{}", "Settings:".green());
    println!("  {}  - Show or load configuration", "config [file]".cyan());
    println!("  {}  - Reload configuration on change", "watch <file>".cyan());
    println!("  {}    - Preview tempo", "tempo [bpm]".cyan());
    println!();
    println!("  {}           - Show this help", "help".bright_green());
    println!("  {}           - Exit", "quit".bright_red());
}
