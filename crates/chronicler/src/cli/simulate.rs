//! Simulate command handler.

use super::load_config;
use chronicler::{
    ChroniclerResult, Orchestrator, ReplayMode, SettlementScript, run_session,
};
use std::path::Path;

/// Run a scripted session, then save the replay log and usage report.
///
/// Providers that cannot be reached are failed over and, once every retry is
/// spent, answered by the offline templates, so the session always completes.
pub async fn simulate(
    config_path: Option<&Path>,
    ticks: u64,
    seed: u64,
    record: Option<&Path>,
    usage_report: &Path,
    settlement: &str,
) -> ChroniclerResult<()> {
    let config = load_config(config_path)?;
    let mut replay = config
        .replay()
        .clone()
        .with_mode(ReplayMode::Record)
        .with_seed(seed);
    if let Some(path) = record {
        replay = replay.with_log_path(path.to_path_buf());
    }
    let config = config.with_replay(replay);

    tracing::info!(ticks, seed, settlement, "Starting simulation");
    let (mut orchestrator, mut completions) = Orchestrator::from_config(config)?;
    let script = SettlementScript::new(settlement);
    let summary = run_session(&mut orchestrator, &mut completions, &script, ticks).await?;

    if record.is_some() {
        orchestrator.save_replay()?;
    }
    orchestrator.usage_report().save_json(usage_report)?;
    let status = orchestrator.status();

    println!("\nSimulation Summary:");
    println!("===================");
    println!("{}", summary);
    println!();
    println!("Total cost:   ${:.4}", status.total_cost_usd);
    println!("Budget hit:   {}", status.budget_exceeded);
    println!("Degraded:     {}", status.degraded);
    println!(
        "Cache:        {} hits, {} misses, {} stale",
        status.cache.hits, status.cache.misses, status.cache.stale_hits
    );
    for provider in &status.providers {
        println!(
            "Provider {}: {} calls, {} failures, healthy: {}",
            provider.name, provider.total_calls, provider.total_failures, provider.is_healthy
        );
    }
    if let Some(path) = record {
        println!("Replay log:   {}", path.display());
    }
    println!("Usage report: {}", usage_report.display());
    Ok(())
}
