//! CLI Module
//!
//! Command-line interface for rendering test signals through effect racks.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::engine::SignalKind;

/// AzAudio DSP - offline renderer for effect racks
#[derive(Parser, Debug)]
#[command(name = "azaudio-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Test signal selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SignalArg {
    Sine,
    Impulse,
    Silence,
    Dc,
}

impl From<SignalArg> for SignalKind {
    fn from(arg: SignalArg) -> Self {
        match arg {
            SignalArg::Sine => SignalKind::Sine,
            SignalArg::Impulse => SignalKind::Impulse,
            SignalArg::Silence => SignalKind::Silence,
            SignalArg::Dc => SignalKind::Dc,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a test signal through a rack and compare levels
    #[command(name = "render")]
    Render {
        /// Rack configuration (JSON); an empty rack when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Test signal to generate
        #[arg(short, long, value_enum, default_value = "sine")]
        signal: SignalArg,

        /// Signal frequency in Hz
        #[arg(short, long, default_value_t = 440.0)]
        frequency: f32,

        /// Signal amplitude (linear)
        #[arg(short, long, default_value_t = 0.5)]
        amplitude: f32,

        /// Duration in seconds
        #[arg(short, long, default_value_t = 1.0)]
        duration: f32,
    },

    /// List node kinds with their tag and state size
    #[command(name = "kinds")]
    Kinds,

    /// Print a rack with one node of every kind
    #[command(name = "default-config")]
    DefaultConfig {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_render() {
        let cli = Cli::parse_from([
            "azaudio-cli",
            "render",
            "--signal",
            "impulse",
            "--duration",
            "0.5",
        ]);
        match cli.command {
            Some(Commands::Render {
                signal,
                duration,
                config,
                ..
            }) => {
                assert_eq!(signal, SignalArg::Impulse);
                assert_eq!(duration, 0.5);
                assert!(config.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
