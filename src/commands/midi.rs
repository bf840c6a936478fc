//! MIDI input REPL commands

use crate::commands::{CommandContext, CommandResult};
use crate::midi::MidiInputHandle;
use colored::*;

/// Handle `midi devices` command - list available MIDI input ports
pub fn cmd_midi_devices(_args: &str, _ctx: &mut CommandContext) -> CommandResult {
    match MidiInputHandle::list_ports() {
        Ok(ports) if ports.is_empty() => CommandResult::Message(
            "No MIDI input ports found. Make sure a keyboard or virtual port is connected."
                .yellow()
                .to_string(),
        ),
        Ok(ports) => {
            let mut output = format!("{}\n", "🎹 Available MIDI Input Ports:".bold());
            for (i, port) in ports.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, port.cyan()));
            }
            output.push_str(&format!(
                "\n{} {}",
                "Use".dimmed(),
                "midi connect <port name>".green()
            ));
            CommandResult::Message(output)
        }
        Err(e) => CommandResult::Error(format!("Failed to list MIDI ports: {}", e)),
    }
}

/// Handle `midi connect <port>` command
pub fn cmd_midi_connect(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Error(
            "Usage: midi connect <port name>\nUse 'midi devices' to see available ports"
                .to_string(),
        );
    }

    let tx = ctx.midi_tx.clone();
    match ctx.midi.connect(args, tx) {
        Ok(name) => CommandResult::Message(format!("🎹 Listening to MIDI port: {}", name.green())),
        Err(e) => CommandResult::Error(format!("Failed to connect to '{}': {}", args, e)),
    }
}

/// Handle `midi disconnect` command
pub fn cmd_midi_disconnect(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    if ctx.midi.disconnect() {
        CommandResult::Message("🎹 Disconnected from MIDI".to_string())
    } else {
        CommandResult::Message("Not connected to a MIDI port".yellow().to_string())
    }
}

/// Handle `midi status` command
pub fn cmd_midi_status(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    let mut output = format!("{}\n", "🎹 MIDI Status:".bold());
    match ctx.midi.connected_port() {
        Some(name) => {
            output.push_str(&format!("  Status: {}\n", "Connected".green().bold()));
            output.push_str(&format!("  Port: {}", name.cyan()));
        }
        None => {
            output.push_str(&format!("  Status: {}\n", "Disconnected".yellow()));
            output.push_str(&format!(
                "  Type notes instead, or use {}",
                "midi connect <port>".green()
            ));
        }
    }
    CommandResult::Message(output)
}
