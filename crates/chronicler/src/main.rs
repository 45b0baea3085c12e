//! Chronicler CLI binary.
//!
//! This binary provides command-line access to Chronicler's functionality:
//! - Run a scripted settlement session and record it
//! - Replay a recorded session and check it for divergence
//! - Inspect saved usage reports

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, replay_session, show_usage, simulate};

    // API keys may live in a local .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Simulate {
            ticks,
            seed,
            record,
            usage_report,
            settlement,
        } => {
            simulate(
                config,
                ticks,
                seed,
                record.as_deref(),
                &usage_report,
                &settlement,
            )
            .await
        }

        Commands::Replay {
            log,
            ticks,
            settlement,
        } => replay_session(config, &log, ticks, &settlement).await,

        Commands::Usage { report, json } => show_usage(&report, json),
    };

    #[cfg(feature = "observability")]
    chronicler::shutdown_observability();

    result?;
    Ok(())
}

#[cfg(feature = "observability")]
fn init_logging(cli: &cli::Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = chronicler::ObservabilityConfig::default()
        .with_json_logs(cli.json_logs)
        .with_export_spans(cli.trace_spans);
    if cli.verbose {
        config = config.with_log_level("debug");
    }
    chronicler::init_observability_with_config(config)
}

#[cfg(not(feature = "observability"))]
fn init_logging(cli: &cli::Cli) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}
