//! Usage command handler.

use chronicler::{ChroniclerResult, UsageAggregate, UsageReport};
use std::path::Path;

/// Print a usage report saved by a previous session.
pub fn show_usage(path: &Path, json: bool) -> ChroniclerResult<()> {
    let report = UsageReport::load_json(path)?;

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => tracing::warn!(error = %e, "Could not format report as JSON"),
        }
        return Ok(());
    }

    println!("\nUsage Report ({})", report.generated_at.to_rfc3339());
    println!("==========================================");
    println!(
        "Budget: ${:.4} of ${:.2}{}",
        report.totals.cost_usd,
        report.budget.limit_usd(),
        if report.budget_exceeded { " (exceeded)" } else { "" }
    );
    print_row("total", &report.totals);

    println!("\nBy model:");
    for (model, aggregate) in &report.by_model {
        print_row(model, aggregate);
    }

    println!("\nBy call type:");
    for (call_type, aggregate) in &report.by_call_type {
        print_row(&call_type.to_string(), aggregate);
    }
    Ok(())
}

fn print_row(label: &str, aggregate: &UsageAggregate) {
    println!(
        "  {:<26} {:>5} calls  {:>5} ok  {:>5} failed  {:>8} tokens  ${:.4}",
        label,
        aggregate.calls,
        aggregate.successes,
        aggregate.failures,
        aggregate.total_tokens(),
        aggregate.cost_usd
    );
}
