//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chronicler - rate-limited, replayable text generation for settlement simulations
#[derive(Parser, Debug)]
#[command(name = "chronicler")]
#[command(about = "Rate-limited, replayable text generation for settlement simulations", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to bundled, home and ./chronicler.toml layers)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Export tracing spans to stdout
    #[arg(long, global = true)]
    pub trace_spans: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scripted settlement session against the configured providers
    Simulate {
        /// Number of ticks to script
        #[arg(long, default_value = "60")]
        ticks: u64,

        /// Seed for jitter and offline template draws
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Save the replay log to this path
        #[arg(long)]
        record: Option<PathBuf>,

        /// Save the usage report to this path
        #[arg(long, default_value = "chronicler-usage.json")]
        usage_report: PathBuf,

        /// Settlement name used in prompts
        #[arg(long, default_value = "Ashford")]
        settlement: String,
    },

    /// Replay a recorded session and report any divergence
    Replay {
        /// Path to the replay log
        log: PathBuf,

        /// Number of ticks to script (defaults to the last recorded tick + 1)
        #[arg(long)]
        ticks: Option<u64>,

        /// Settlement name used when recording
        #[arg(long, default_value = "Ashford")]
        settlement: String,
    },

    /// Print a saved usage report
    Usage {
        /// Path to the usage report
        report: PathBuf,

        /// Print the raw JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}
