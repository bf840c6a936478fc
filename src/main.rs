use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use etude::{load_config, ReplOptions};
use etude_core::{DifficultyLevel, EngineConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "etude")]
#[command(about = "Adaptive note, interval and triad practice", long_about = None)]
struct Cli {
    /// JSON engine configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Reload the configuration file when it changes
    #[arg(short, long, requires = "config")]
    watch: bool,
    /// Save session records to this JSON file
    #[arg(short, long)]
    store: Option<PathBuf>,
    /// Start a session right away (single, interval or triad)
    #[arg(short, long)]
    difficulty: Option<String>,
    /// Connect to the first MIDI input port whose name contains this text
    #[arg(short, long)]
    midi: Option<String>,
    /// Seed for reproducible pattern sequences
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    if cli.seed.is_some() {
        config.generator.seed = cli.seed;
    }

    let difficulty = cli
        .difficulty
        .as_deref()
        .map(str::parse::<DifficultyLevel>)
        .transpose()
        .context("invalid --difficulty")?;

    etude::start(ReplOptions {
        config,
        config_path: cli.config,
        watch_config: cli.watch,
        store_path: cli.store,
        difficulty,
        midi_port: cli.midi,
    })
}
