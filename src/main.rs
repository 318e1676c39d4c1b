//! AzAudio CLI - Effects Rack Renderer
//!
//! Command-line interface for the AzAudio DSP engine.

use clap::Parser;
use env_logger::Env;
use log::info;

use azaudio::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    info!("AzAudio DSP v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("AzAudio DSP v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Render {
            config,
            signal,
            frequency,
            amplitude,
            duration,
        } => commands::render(
            config.as_deref(),
            signal.into(),
            frequency,
            amplitude,
            duration,
        )?,
        Commands::Kinds => commands::list_kinds()?,
        Commands::DefaultConfig { output } => commands::default_config(output.as_deref())?,
    }
    Ok(())
}
