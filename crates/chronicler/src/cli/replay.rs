//! Replay command handler.

use super::load_config;
use chronicler::{
    ChroniclerResult, Orchestrator, ReplayLog, SettlementScript, build_provider, run_session,
};
use std::path::Path;

/// Re-run the scripted session against a recorded log and compare outputs.
///
/// No provider is called; every response comes from the log.
///
/// # Errors
///
/// Returns a replay error for the first divergence, in addition to the usual
/// configuration and I/O failures.
pub async fn replay_session(
    config_path: Option<&Path>,
    log_path: &Path,
    ticks: Option<u64>,
    settlement: &str,
) -> ChroniclerResult<()> {
    let config = load_config(config_path)?;
    let log = ReplayLog::load(log_path)?;
    let ticks = ticks.unwrap_or_else(|| log.last_tick().map_or(0, |tick| tick + 1));
    let recorded_calls = log.calls.len();

    let providers = config
        .providers()
        .iter()
        .map(build_provider)
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(path = %log_path.display(), ticks, seed = log.seed, "Replaying session");
    let (mut orchestrator, mut completions) = Orchestrator::replaying(config, providers, log)?;
    let script = SettlementScript::new(settlement);
    let summary = run_session(&mut orchestrator, &mut completions, &script, ticks).await?;

    println!("\nReplay Summary:");
    println!("===============");
    println!("{}", summary);
    println!();
    println!("Recorded calls:   {}", recorded_calls);
    println!(
        "Unconsumed calls: {}",
        orchestrator.replay_remaining().unwrap_or(0)
    );
    println!("Divergences:      {}", orchestrator.divergences().len());

    match orchestrator.replay_comparison() {
        Some(comparison) => {
            let matched = comparison.into_result()?;
            println!("Matched calls:    {} (identical)", matched);
        }
        None => println!("No comparison available"),
    }
    Ok(())
}
