//! Practice session commands and note feedback

use crate::commands::{CommandContext, CommandResult};
use crate::store::JsonFileStore;
use anyhow::{anyhow, Result};
use colored::*;
use etude_core::types::note::{midi_name, MIDI_MAX};
use etude_core::{
    AnalyticsSnapshot, DifficultyLevel, Pattern, PatternOutcome, Pitch, SessionStore,
    SessionSummary,
};
use std::fs;
use std::path::PathBuf;

/// Parse typed notes such as `C E G`, `F#4, Bb3` or raw MIDI numbers
pub fn parse_notes(input: &str) -> Result<Vec<u8>> {
    let notes: Vec<u8> = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(parse_note)
        .collect::<Result<_>>()?;
    if notes.is_empty() {
        return Err(anyhow!("No notes given"));
    }
    Ok(notes)
}

fn parse_note(token: &str) -> Result<u8> {
    if token.chars().all(|c| c.is_ascii_digit()) {
        let midi: u16 = token.parse()?;
        if midi > MIDI_MAX as u16 {
            return Err(anyhow!("MIDI note {} is above {}", midi, MIDI_MAX));
        }
        return Ok(midi as u8);
    }
    Ok(token.parse::<Pitch>()?.midi())
}

/// Line shown when a pattern becomes active
pub fn prompt(pattern: &Pattern) -> String {
    format!("{} {}", "🎼 Play".bright_yellow(), pattern.to_colored_string())
}

/// Validate one note and describe what happened. Completed patterns advance
/// to the next one.
pub fn on_note(ctx: &mut CommandContext, midi: u8, timestamp_ms: f64) -> String {
    if ctx.engine.current_pattern().is_none() {
        return format!(
            "{} No active pattern. Type '{}' to begin.",
            "Note ignored:".yellow(),
            "start".bright_green()
        );
    }

    let level_before = ctx.engine.difficulty();
    let result = ctx.engine.validate_note(Some(midi), timestamp_ms);
    let name = midi_name(midi);
    let mut output = if result.correct {
        format!("{} {}", "✓".bright_green(), name.green())
    } else {
        format!("{} {}", "✗".bright_red(), name.red())
    };

    match ctx.engine.outcome() {
        PatternOutcome::Completed => {
            output.push_str(&format!(
                "  {} in {:.0} ms",
                "Pattern complete".bright_green().bold(),
                result.response_time_ms
            ));
            let level = ctx.engine.difficulty();
            if level != level_before {
                output.push_str(&format!(
                    "\n{} {}",
                    "⬆ Level up:".bright_cyan().bold(),
                    level.label()
                ));
            }
            let next = ctx.engine.get_next_pattern();
            output.push('\n');
            output.push_str(&prompt(&next));
        }
        PatternOutcome::Failed => {
            output.push_str(&format!(
                "  {} type '{}' or '{}'",
                "Pattern missed;".yellow(),
                "retry".bright_green(),
                "next".bright_green()
            ));
        }
        PatternOutcome::Pending => {}
    }
    output
}

/// Handle `start [difficulty]`
pub fn cmd_start(args: &str, ctx: &mut CommandContext) -> CommandResult {
    let level = if args.is_empty() {
        ctx.engine.config().starting_difficulty
    } else {
        match args.parse::<DifficultyLevel>() {
            Ok(level) => level,
            Err(e) => return CommandResult::Error(e.to_string()),
        }
    };
    ctx.engine.start_session(level);
    let pattern = ctx.engine.get_next_pattern();
    CommandResult::Message(format!(
        "{} {} ({})\n{}",
        "🎹 Session started:".bright_cyan().bold(),
        level.label(),
        if ctx.engine.is_adaptive() { "adaptive" } else { "fixed" },
        prompt(&pattern)
    ))
}

/// Handle `next` / `skip`
pub fn cmd_next(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    let pattern = ctx.engine.get_next_pattern();
    CommandResult::Message(prompt(&pattern))
}

/// Handle `retry`
pub fn cmd_retry(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    match ctx.engine.retry_pattern() {
        Some(pattern) => CommandResult::Message(format!("🔁 {}", prompt(&pattern))),
        None => CommandResult::Error("No pattern to retry".to_string()),
    }
}

/// Handle `play <notes>`
pub fn cmd_play(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Error("Usage: play <notes>, e.g. play C E G".to_string());
    }
    match parse_notes(args) {
        Ok(notes) => CommandResult::Message(play_notes(ctx, &notes)),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

/// Validate each note in turn, stamped with the engine clock
pub fn play_notes(ctx: &mut CommandContext, notes: &[u8]) -> String {
    notes
        .iter()
        .map(|&midi| {
            let now = ctx.engine.now_ms();
            on_note(ctx, midi, now)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Handle `listen` - preview the active pattern
pub fn cmd_listen(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    let Some(pattern) = ctx.engine.current_pattern().cloned() else {
        return CommandResult::Error("No active pattern".to_string());
    };
    match ctx.preview().and_then(|player| player.play(&pattern)) {
        Ok(()) => CommandResult::Message(format!("🔊 {}", pattern)),
        Err(e) => CommandResult::Error(format!("Audio preview failed: {}", e)),
    }
}

/// Handle `notation` - print the active pattern's MusicXML payload
pub fn cmd_notation(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    match ctx.engine.current_pattern() {
        Some(pattern) => CommandResult::Message(pattern.notation().to_string()),
        None => CommandResult::Error("No active pattern".to_string()),
    }
}

/// Handle `difficulty [level]`
pub fn cmd_difficulty(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Message(format!(
            "Current difficulty: {}",
            ctx.engine.difficulty().label().cyan()
        ));
    }
    match args.parse::<DifficultyLevel>() {
        Ok(level) => {
            ctx.engine.set_difficulty(level);
            CommandResult::Message(
                format!("🎯 Difficulty set to {} from the next pattern", level.label())
                    .bright_green()
                    .to_string(),
            )
        }
        Err(e) => CommandResult::Error(format!(
            "{} (use single, interval or triad)",
            e
        )),
    }
}

/// Handle `adaptive [on|off]`
pub fn cmd_adaptive(args: &str, ctx: &mut CommandContext) -> CommandResult {
    let enabled = match args.to_lowercase().as_str() {
        "" => {
            return CommandResult::Message(format!(
                "Adaptive difficulty is {}",
                if ctx.engine.is_adaptive() { "on" } else { "off" }
            ))
        }
        "on" | "true" | "yes" => true,
        "off" | "false" | "no" => false,
        _ => return CommandResult::Error("Usage: adaptive [on|off]".to_string()),
    };
    ctx.engine.set_adaptive(enabled);
    CommandResult::Message(format!(
        "Adaptive difficulty {}",
        if enabled { "enabled".green() } else { "disabled".yellow() }
    ))
}

/// Handle `reset`
pub fn cmd_reset(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    ctx.engine.reset_session();
    let pattern = ctx.engine.get_next_pattern();
    CommandResult::Message(format!(
        "{}\n{}",
        "Session reset".bright_cyan(),
        prompt(&pattern)
    ))
}

pub fn format_summary(summary: &SessionSummary) -> String {
    let mut output = format!("{}\n", "📊 Session Summary".bold());
    output.push_str(&format!(
        "  Attempts: {} ({} correct, {:.0}%)\n",
        summary.total_attempts,
        summary.correct_attempts,
        summary.accuracy * 100.0
    ));
    output.push_str(&format!(
        "  Average time: {:.0} ms   Trend: {:?}\n",
        summary.average_response_ms, summary.trend
    ));
    for line in &summary.difficulties {
        if line.attempts == 0 {
            continue;
        }
        output.push_str(&format!(
            "  {:<13} {:>4} attempts  {:>5.1}%  {:>6.0} ms\n",
            line.difficulty.label(),
            line.attempts,
            line.accuracy * 100.0,
            line.average_time_ms
        ));
    }
    if !summary.strengths.is_empty() {
        let names: Vec<&str> = summary.strengths.iter().map(|d| d.label()).collect();
        output.push_str(&format!("  {} {}\n", "Strengths:".green(), names.join(", ")));
    }
    if !summary.weaknesses.is_empty() {
        let names: Vec<&str> = summary.weaknesses.iter().map(|d| d.label()).collect();
        output.push_str(&format!("  {} {}\n", "Weaknesses:".red(), names.join(", ")));
    }
    for recommendation in &summary.recommendations {
        output.push_str(&format!("  💡 {}\n", recommendation));
    }
    output.trim_end().to_string()
}

/// Handle `summary`
pub fn cmd_summary(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    CommandResult::Message(format_summary(&ctx.engine.session_summary()))
}

/// Handle `progress [pattern id]`; defaults to the active pattern
pub fn cmd_progress(args: &str, ctx: &mut CommandContext) -> CommandResult {
    let pattern_id = if args.is_empty() {
        match ctx.engine.current_pattern() {
            Some(pattern) => pattern.signature(),
            None => return CommandResult::Error("Usage: progress <pattern id>".to_string()),
        }
    } else {
        args.to_string()
    };

    match ctx.engine.pattern_progress(&pattern_id) {
        Some(p) => CommandResult::Message(format!(
            "{} {}\n  Attempts: {}  Accuracy: {:.0}%\n  Accuracy change: {:+.0}%  Time change: {:+.0} ms{}",
            "📈".bright_yellow(),
            pattern_id.cyan(),
            p.attempts,
            p.accuracy * 100.0,
            p.accuracy_delta * 100.0,
            p.time_delta_ms,
            if p.plateau {
                format!("\n  {}", "Plateau: times have stopped improving".yellow())
            } else {
                String::new()
            }
        )),
        None => CommandResult::Message(format!("No attempts recorded for {}", pattern_id)),
    }
}

/// Handle `problems`
pub fn cmd_problems(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    let analytics = ctx.engine.analytics();
    let problems = analytics.problem_patterns();
    let slow = analytics.slow_patterns();
    let notes = analytics.problematic_notes();

    if problems.is_empty() && slow.is_empty() && notes.is_empty() {
        return CommandResult::Message("No problem areas yet".green().to_string());
    }

    let mut output = String::new();
    if !problems.is_empty() {
        output.push_str(&format!("{}\n", "Low accuracy patterns:".red().bold()));
        for metric in problems {
            output.push_str(&format!(
                "  {:<24} {:>5.1}% over {} attempts\n",
                metric.pattern_id,
                metric.accuracy() * 100.0,
                metric.attempts
            ));
        }
    }
    if !slow.is_empty() {
        output.push_str(&format!("{}\n", "Slow patterns:".yellow().bold()));
        for metric in slow {
            output.push_str(&format!(
                "  {:<24} {:>6.0} ms average\n",
                metric.pattern_id,
                metric.average_time_ms()
            ));
        }
    }
    if !notes.is_empty() {
        output.push_str(&format!("{}\n", "Problem notes:".magenta().bold()));
        for metric in notes {
            output.push_str(&format!(
                "  {:<4} {:>5.1}% over {} attempts\n",
                midi_name(metric.midi),
                metric.accuracy() * 100.0,
                metric.attempts
            ));
        }
    }
    CommandResult::Message(output.trim_end().to_string())
}

/// Handle `stats` - queue health and note tally
pub fn cmd_stats(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    let queue = ctx.engine.queue_stats();
    let tally = ctx.engine.note_stats();
    CommandResult::Message(format!(
        "{}\n  Queue: {} {} ({}/{})  generated {}  served {}\n  Generation: {:.3} ms average  emergencies {}  fallbacks {}\n  Notes: {} played, {:.0}% correct, streak {} (best {})",
        "📋 Engine Stats".bold(),
        queue.status,
        queue.difficulty,
        queue.size,
        queue.capacity,
        queue.generated,
        queue.consumed,
        queue.average_generation_ms,
        queue.emergency_generations,
        queue.fallbacks,
        tally.total_notes,
        tally.accuracy() * 100.0,
        tally.streak,
        tally.best_streak
    ))
}

/// Handle `save [path]`. A path also becomes the store for automatic saves.
pub fn cmd_save(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if !args.is_empty() {
        ctx.use_store(PathBuf::from(args));
    }
    let Some(path) = ctx.store_path.clone() else {
        return CommandResult::Error("Usage: save <file.json>".to_string());
    };
    let Some(record) = ctx.engine.session_record() else {
        return CommandResult::Error("No session to save yet".to_string());
    };
    match JsonFileStore::new(&path).save_or_update_session(&record) {
        Ok(()) => CommandResult::Message(format!(
            "💾 Saved {} to {}",
            record.session_id,
            path.display().to_string().bright_green()
        )),
        Err(e) => CommandResult::Error(format!("{:#}", e)),
    }
}

fn export_to(path: &str, ctx: &CommandContext) -> Result<usize> {
    let snapshot = ctx.engine.export_analytics();
    let json = snapshot.to_json()?;
    fs::write(path, json)?;
    Ok(snapshot.patterns.len())
}

/// Handle `export <path>`
pub fn cmd_export(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Error("Usage: export <file.json>".to_string());
    }
    match export_to(args, ctx) {
        Ok(count) => CommandResult::Message(format!(
            "📤 Exported analytics for {} patterns to {}",
            count,
            args.bright_green()
        )),
        Err(e) => CommandResult::Error(format!("Export failed: {}", e)),
    }
}

fn import_from(path: &str, ctx: &mut CommandContext) -> Result<usize> {
    let json = fs::read_to_string(path)?;
    let snapshot = AnalyticsSnapshot::from_json(&json)?;
    let count = snapshot.patterns.len();
    ctx.engine.import_analytics(snapshot)?;
    Ok(count)
}

/// Handle `import <path>`
pub fn cmd_import(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Error("Usage: import <file.json>".to_string());
    }
    match import_from(args, ctx) {
        Ok(count) => CommandResult::Message(format!(
            "📥 Imported analytics for {} patterns",
            count
        )),
        Err(e) => CommandResult::Error(format!("Import failed: {}", e)),
    }
}
