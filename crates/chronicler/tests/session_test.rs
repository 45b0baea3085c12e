//! End-to-end tests of the scripted settlement session.

use async_trait::async_trait;
use chronicler::{
    BackoffConfig, CallType, ChroniclerConfig, LlmProvider, Orchestrator, Priority,
    ProviderError, ProviderErrorKind, ProviderResponse, ProviderResult, ReplayConfig, ReplayLog,
    ReplayMode, ResponseSource, SettlementScript, TokenUsage, UsageReport, run_session,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Answers every prompt by echoing its length, failing every `fail_every`th call.
struct EchoProvider {
    calls: AtomicUsize,
    fail_every: usize,
}

impl EchoProvider {
    fn new(fail_every: usize) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_every,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn shared(provider: &Arc<EchoProvider>) -> Arc<dyn LlmProvider> {
    provider.clone()
}

#[async_trait]
impl LlmProvider for EchoProvider {
    async fn call_llm(&self, prompt: &str) -> ProviderResult<ProviderResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every > 0 && call % self.fail_every == 0 {
            return Err(ProviderError::new(ProviderErrorKind::Timeout(10_000)));
        }
        let words = prompt.split_whitespace().count() as u64;
        Ok(ProviderResponse::new(
            format!("echo of {} words", words),
            TokenUsage::new(words, 4),
        ))
    }

    fn is_available(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &str {
        "echo"
    }

    fn model_name(&self) -> &str {
        "echo-1"
    }
}

/// Refuses every call.
struct DownProvider;

#[async_trait]
impl LlmProvider for DownProvider {
    async fn call_llm(&self, _prompt: &str) -> ProviderResult<ProviderResponse> {
        Err(ProviderError::new(ProviderErrorKind::Network(
            "connection refused".to_string(),
        )))
    }

    fn is_available(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &str {
        "down"
    }

    fn model_name(&self) -> &str {
        "down-1"
    }
}

fn config(seed: u64) -> ChroniclerConfig {
    ChroniclerConfig::default()
        .with_replay(ReplayConfig::default().with_mode(ReplayMode::Record).with_seed(seed))
}

#[test]
fn script_is_a_function_of_the_tick() {
    let script = SettlementScript::new("Ashford");
    assert_eq!(script.requests_for(4), script.requests_for(4));

    let opening = script.requests_for(0);
    assert_eq!(opening.len(), 2);
    assert_eq!(opening[0].call_type, CallType::DecisionInterpretation);
    assert_eq!(opening[0].priority, Priority::Urgent);
    assert!(opening[1].prompt.contains("Ashford"));

    assert!(script.requests_for(1).is_empty());
    assert_eq!(script.requests_for(3)[0].call_type, CallType::NarrativeEvent);
    assert_eq!(script.requests_for(7)[0].call_type, CallType::NarrativeContext);
}

#[tokio::test]
async fn every_accepted_request_resolves() {
    let provider = EchoProvider::new(0);
    let (mut orchestrator, mut completions) =
        Orchestrator::new(config(1), vec![shared(&provider)]).unwrap();

    let summary = run_session(
        &mut orchestrator,
        &mut completions,
        &SettlementScript::default(),
        30,
    )
    .await
    .unwrap();

    assert!(summary.submitted > 0);
    assert_eq!(
        summary.delivered + summary.timed_out + summary.failed,
        summary.submitted
    );
    assert_eq!(summary.failed, 0);
    assert!(summary.count_from(ResponseSource::Provider) > 0);
    assert!(summary.count_from(ResponseSource::Cache) > 0);
    assert_eq!(orchestrator.queue_depths().total(), 0);
    assert!(provider.calls() > 0);
}

#[tokio::test]
async fn unreachable_providers_end_in_offline_responses() {
    let down: Arc<dyn LlmProvider> = Arc::new(DownProvider);
    let (mut orchestrator, mut completions) = Orchestrator::new(config(2), vec![down]).unwrap();

    let summary = run_session(
        &mut orchestrator,
        &mut completions,
        &SettlementScript::default(),
        20,
    )
    .await
    .unwrap();

    assert_eq!(summary.failed, 0);
    assert!(summary.count_from(ResponseSource::Offline) > 0);
    assert_eq!(summary.count_from(ResponseSource::Provider), 0);
    assert_eq!(orchestrator.usage().total_cost(), 0.0);
}

#[tokio::test]
async fn recorded_session_replays_identically_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("session.json");
    let report_path = dir.path().join("usage.json");
    let recording_config = config(99)
        .with_backoff(BackoffConfig::default())
        .with_replay(
            ReplayConfig::default()
                .with_mode(ReplayMode::Record)
                .with_seed(99)
                .with_log_path(log_path.clone()),
        );

    let flaky = EchoProvider::new(3);
    let (mut recording, mut recorded_completions) =
        Orchestrator::new(recording_config.clone(), vec![shared(&flaky)]).unwrap();
    let recorded = run_session(
        &mut recording,
        &mut recorded_completions,
        &SettlementScript::default(),
        40,
    )
    .await
    .unwrap();
    recording.save_replay().unwrap();
    recording.usage_report().save_json(&report_path).unwrap();

    let log = ReplayLog::load(&log_path).unwrap();
    assert_eq!(log.seed, 99);
    assert!(!log.decisions.is_empty());

    let idle = EchoProvider::new(0);
    let (mut replaying, mut replayed_completions) =
        Orchestrator::replaying(recording_config, vec![shared(&idle)], log).unwrap();
    let replayed = run_session(
        &mut replaying,
        &mut replayed_completions,
        &SettlementScript::default(),
        40,
    )
    .await
    .unwrap();

    assert_eq!(idle.calls(), 0);
    assert!(replaying.divergences().is_empty());
    assert!(replaying.replay_comparison().unwrap().is_identical());
    assert_eq!(replayed.delivered, recorded.delivered);
    assert_eq!(
        replaying.usage().totals().total_tokens(),
        recording.usage().totals().total_tokens()
    );

    let report = UsageReport::load_json(&report_path).unwrap();
    assert_eq!(report.totals, *recording.usage().totals());
}
