use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::evolution::EvolutionMode;

/// `FrontSwatch` - ranked, diverse UI design candidates from style parameters.
#[derive(Parser, Debug)]
#[command(name = "frontswatch")]
#[command(version)]
#[command(about = "Evolve ranked UI design-DNA candidates.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.frontswatch/config.toml, or $FRONTSWATCH_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Host to bind to (default: gateway.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on, 0 for any free port (default: gateway.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one generation and print the result as JSON
    Generate {
        /// Number of parameter sets (5-200)
        #[arg(short, long)]
        count: Option<u32>,

        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Family to favour, as vibe/era (repeatable)
        #[arg(long = "focus")]
        focus: Vec<String>,

        /// Board families; with --variants overrides --count
        #[arg(long)]
        families: Option<u32>,

        /// Variants kept per family on the board
        #[arg(long)]
        variants: Option<u32>,

        /// Re-score the shortlist with the configured judge
        #[arg(long)]
        llm_aesthetic: bool,

        /// Seed the random source for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        target_ui: Option<String>,
    },

    /// Translate preference events into a run, printing progress as JSON lines
    Stream {
        /// JSON array of preference events (default: none)
        #[arg(long)]
        events: Option<PathBuf>,

        #[arg(long)]
        target_ui: Option<String>,
    },

    /// Show the resolved provider configuration
    Config,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    Exploration,
    Exploitation,
}

impl From<ModeArg> for EvolutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Exploration => Self::Exploration,
            ModeArg::Exploitation => Self::Exploitation,
        }
    }
}
