//! A scripted settlement session for exercising the orchestrator end to end.
//!
//! The script is a pure function of the tick, so a recorded session and its
//! replay submit exactly the same prompts in the same order.

use chronicler_core::{CallType, Priority, ResponseSource};
use chronicler_error::{ChroniclerErrorKind, ChroniclerResult};
use chronicler_orchestrator::{Completion, Orchestrator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, instrument, warn};

const DECISIONS: &[&str] = &[
    "ration the winter grain",
    "open the gates to refugees",
    "raise a levy for the wall",
    "exile the horse thief",
];

const RESIDENTS: &[&str] = &["the miller", "the blacksmith", "the midwife", "the reeve", "the bard"];

const EVENTS: &[&str] = &[
    "a spring flood on the lower fields",
    "a fire in the tannery",
    "a merchant caravan arriving",
];

/// One request the script submits on a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedRequest {
    /// Prompt text
    pub prompt: String,
    /// Purpose of the request
    pub call_type: CallType,
    /// Queue lane
    pub priority: Priority,
}

/// Deterministic request schedule for a named settlement.
///
/// Decisions arrive every fifth tick, dialogue every other tick, narrative
/// events and background context less often. Prompts cycle through small
/// pools so later ticks repeat earlier content and exercise the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementScript {
    settlement: String,
}

impl SettlementScript {
    /// Script for `settlement`.
    pub fn new(settlement: impl Into<String>) -> Self {
        Self {
            settlement: settlement.into(),
        }
    }

    /// Requests submitted on `tick`, in submission order.
    pub fn requests_for(&self, tick: u64) -> Vec<ScriptedRequest> {
        let mut requests = Vec::new();
        if tick % 5 == 0 {
            requests.push(ScriptedRequest {
                prompt: format!(
                    "The council of {} decides to {}. Interpret the consequences.",
                    self.settlement,
                    pick(DECISIONS, tick / 5)
                ),
                call_type: CallType::DecisionInterpretation,
                priority: Priority::Urgent,
            });
        }
        if tick % 2 == 0 {
            requests.push(ScriptedRequest {
                prompt: format!(
                    "Write a short greeting from {} of {}.",
                    pick(RESIDENTS, tick / 2),
                    self.settlement
                ),
                call_type: CallType::NpcDialogue,
                priority: Priority::Standard,
            });
        }
        if tick % 10 == 3 {
            requests.push(ScriptedRequest {
                prompt: format!(
                    "Narrate {} in {}.",
                    pick(EVENTS, tick / 10),
                    self.settlement
                ),
                call_type: CallType::NarrativeEvent,
                priority: Priority::Background,
            });
        }
        if tick % 15 == 7 {
            requests.push(ScriptedRequest {
                prompt: format!("Summarize the founding legend of {}.", self.settlement),
                call_type: CallType::NarrativeContext,
                priority: Priority::Background,
            });
        }
        requests
    }
}

impl Default for SettlementScript {
    fn default() -> Self {
        Self::new("Ashford")
    }
}

fn pick(pool: &[&'static str], index: u64) -> &'static str {
    pool[(index % pool.len() as u64) as usize]
}

/// Outcome counts for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Ticks processed, including the drain after the script ends
    pub ticks: u64,
    /// Requests accepted by the queue
    pub submitted: usize,
    /// Requests the queue turned away
    pub rejected: usize,
    /// Completions carrying a response
    pub delivered: usize,
    /// Completions that timed out in the queue
    pub timed_out: usize,
    /// Completions carrying any other error
    pub failed: usize,
    /// Delivered responses by where they came from
    pub by_source: BTreeMap<String, usize>,
}

impl SessionSummary {
    fn record(&mut self, completion: Completion) {
        match completion.result {
            Ok(response) => {
                self.delivered += 1;
                *self.by_source.entry(response.source.to_string()).or_default() += 1;
            }
            Err(e) if matches!(e.kind(), ChroniclerErrorKind::Queue(_)) => {
                debug!(id = %completion.request_id, error = %e, "Request timed out");
                self.timed_out += 1;
            }
            Err(e) => {
                warn!(id = %completion.request_id, error = %e, "Request failed");
                self.failed += 1;
            }
        }
    }

    /// Delivered responses that came from `source`.
    pub fn count_from(&self, source: ResponseSource) -> usize {
        self.by_source
            .get(&source.to_string())
            .copied()
            .unwrap_or(0)
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ticks:      {}", self.ticks)?;
        writeln!(
            f,
            "Submitted:  {} ({} rejected)",
            self.submitted, self.rejected
        )?;
        writeln!(f, "Delivered:  {}", self.delivered)?;
        writeln!(f, "Timed out:  {}", self.timed_out)?;
        write!(f, "Failed:     {}", self.failed)?;
        for (source, count) in &self.by_source {
            write!(f, "\n  {:<12} {}", source, count)?;
        }
        Ok(())
    }
}

/// Drive `orchestrator` through `ticks` ticks of `script`.
///
/// After the script ends, ticks keep running until the queue is empty or the
/// longest queue timeout has passed, so every accepted request resolves.
///
/// # Errors
///
/// Returns an error if a periodic replay log flush fails. Queue rejections
/// and failed requests are counted, not returned.
#[instrument(skip(orchestrator, completions, script), fields(settlement = %script.settlement))]
pub async fn run_session(
    orchestrator: &mut Orchestrator,
    completions: &mut UnboundedReceiver<Completion>,
    script: &SettlementScript,
    ticks: u64,
) -> ChroniclerResult<SessionSummary> {
    let mut summary = SessionSummary::default();
    let drain_limit = ticks + orchestrator.config().queue().max_timeout_ticks() + 1;

    let mut tick = 0;
    while tick < ticks || (tick < drain_limit && orchestrator.queue_depths().total() > 0) {
        if tick < ticks {
            for request in script.requests_for(tick) {
                match orchestrator.submit(request.prompt, request.call_type, request.priority) {
                    Ok(_) => summary.submitted += 1,
                    Err(e) => {
                        debug!(tick, error = %e, "Request rejected");
                        summary.rejected += 1;
                    }
                }
            }
        }

        orchestrator.process_queue(tick).await?;
        while let Ok(completion) = completions.try_recv() {
            summary.record(completion);
        }
        tick += 1;
    }

    summary.ticks = tick;
    info!(
        delivered = summary.delivered,
        failed = summary.failed,
        timed_out = summary.timed_out,
        "Session finished"
    );
    Ok(summary)
}
