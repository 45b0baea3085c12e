//! Tests for tick-driven dispatch through the orchestrator.

mod common;

use chronicler_core::{CallType, OFFLINE_PROVIDER_NAME, Priority, ResponseSource};
use chronicler_error::{ChroniclerErrorKind, ProviderErrorKind, QueueErrorKind, ReplayErrorKind};
use chronicler_models::OFFLINE_MODEL_NAME;
use chronicler_orchestrator::{
    ChroniclerConfig, Completion, OFFLINE_TEMPLATE_PURPOSE, Orchestrator, PricingEntry,
    QueueConfig,
};
use chronicler_rate_limit::{BackoffConfig, RateLimitConfig, RecoveryConfig};
use common::{MockProvider, MockResponse, network_error, test_config};
use tokio::sync::mpsc::UnboundedReceiver;

fn drain(receiver: &mut UnboundedReceiver<Completion>) -> Vec<Completion> {
    std::iter::from_fn(|| receiver.try_recv().ok()).collect()
}

#[test]
fn no_providers_is_a_configuration_error() {
    let err = Orchestrator::new(test_config(), vec![]).unwrap_err();
    assert!(matches!(err.kind(), ChroniclerErrorKind::Config(_)));
}

#[tokio::test]
async fn submitted_request_completes_once_and_duplicates_share_it() {
    let provider = MockProvider::success("primary", "The harvest was good.");
    let (mut orchestrator, mut completions) =
        Orchestrator::new(test_config(), vec![provider.shared()]).unwrap();

    let first = orchestrator
        .submit("Ask about the harvest", CallType::NpcDialogue, Priority::Standard)
        .unwrap();
    let second = orchestrator
        .submit("Ask about the harvest", CallType::NpcDialogue, Priority::Urgent)
        .unwrap();
    assert_eq!(first, second);

    assert_eq!(orchestrator.process_queue(0).await.unwrap(), 1);
    let delivered = drain(&mut completions);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].request_id, first);

    let response = delivered[0].result.as_ref().unwrap();
    assert_eq!(response.text, "The harvest was good.");
    assert_eq!(response.source, ResponseSource::Provider);
    assert_eq!(response.provider, "primary");
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn fresh_cache_entries_answer_without_a_call() {
    let provider = MockProvider::success("primary", "Welcome, traveler.");
    let (mut orchestrator, mut completions) =
        Orchestrator::new(test_config(), vec![provider.shared()]).unwrap();

    orchestrator
        .submit("Greet the traveler", CallType::NpcDialogue, Priority::Standard)
        .unwrap();
    orchestrator.process_queue(0).await.unwrap();

    orchestrator.process_queue(1).await.unwrap();
    orchestrator
        .submit("Greet the traveler", CallType::NpcDialogue, Priority::Standard)
        .unwrap();
    orchestrator.process_queue(1).await.unwrap();

    let delivered = drain(&mut completions);
    assert_eq!(delivered.len(), 2);
    let cached = delivered[1].result.as_ref().unwrap();
    assert_eq!(cached.source, ResponseSource::Cache);
    assert_eq!(cached.text, "Welcome, traveler.");
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn expired_cache_entries_are_fetched_again() {
    let provider = MockProvider::success("primary", "Raise the granary tax.");
    let (mut orchestrator, _completions) =
        Orchestrator::new(test_config(), vec![provider.shared()]).unwrap();

    orchestrator
        .submit("Interpret: tax grain", CallType::DecisionInterpretation, Priority::Urgent)
        .unwrap();
    orchestrator.process_queue(0).await.unwrap();

    // Decision interpretations live for five seconds
    orchestrator.process_queue(10).await.unwrap();
    orchestrator
        .submit("Interpret: tax grain", CallType::DecisionInterpretation, Priority::Urgent)
        .unwrap();
    orchestrator.process_queue(10).await.unwrap();

    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn failed_attempt_is_retried_on_a_later_tick() {
    let provider = MockProvider::sequence(
        "primary",
        vec![
            MockResponse::Error(network_error()),
            MockResponse::Success("Recovered".into()),
        ],
    );
    let (mut orchestrator, mut completions) =
        Orchestrator::new(test_config(), vec![provider.shared()]).unwrap();

    orchestrator
        .submit("Describe the storm", CallType::NarrativeEvent, Priority::Standard)
        .unwrap();

    assert_eq!(orchestrator.process_queue(0).await.unwrap(), 0);
    assert_eq!(orchestrator.queue_depths().standard, 1);

    // A one second backoff is one tick
    assert_eq!(orchestrator.process_queue(1).await.unwrap(), 1);
    let delivered = drain(&mut completions);
    assert_eq!(delivered[0].result.as_ref().unwrap().text, "Recovered");

    let log = orchestrator.replay_log().unwrap();
    let attempts: Vec<(u64, u32, bool)> = log
        .calls
        .iter()
        .map(|record| (record.tick, record.attempt_number, record.success))
        .collect();
    assert_eq!(attempts, vec![(0, 0, false), (1, 1, true)]);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_fall_back_to_offline() {
    let provider = MockProvider::failing("primary", network_error());
    let (mut orchestrator, _completions) =
        Orchestrator::new(test_config(), vec![provider.shared()]).unwrap();

    let response = orchestrator
        .call("The well has run dry", CallType::NarrativeEvent)
        .await
        .unwrap();

    assert_eq!(response.source, ResponseSource::Offline);
    assert_eq!(response.provider, OFFLINE_PROVIDER_NAME);
    assert!(!response.text.is_empty());
    // The first attempt plus three retries
    assert_eq!(provider.call_count(), 4);

    let usage = orchestrator.usage();
    let network = usage.model_usage("primary-model").unwrap();
    assert_eq!((network.calls, network.failures), (4, 4));
    assert_eq!(usage.model_usage(OFFLINE_MODEL_NAME).unwrap().successes, 1);

    let log = orchestrator.replay_log().unwrap();
    let offline_record = log.calls.last().unwrap();
    assert_eq!(offline_record.provider, OFFLINE_PROVIDER_NAME);
    assert!(offline_record.random_seed.is_some());
    assert!(log
        .decisions
        .iter()
        .any(|decision| decision.purpose == OFFLINE_TEMPLATE_PURPOSE));
}

#[tokio::test]
async fn permanent_failure_surfaces_when_fallback_is_disabled() {
    let provider = MockProvider::failing(
        "primary",
        ProviderErrorKind::Unauthorized("invalid key".into()),
    );
    let config = test_config().with_recovery(
        RecoveryConfig::default()
            .with_fallback_to_offline(false)
            .with_consecutive_error_limit(100),
    );
    let (mut orchestrator, _completions) =
        Orchestrator::new(config, vec![provider.shared()]).unwrap();

    let err = orchestrator
        .call("Interpret: exile the thief", CallType::DecisionInterpretation)
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ChroniclerErrorKind::Provider(_)));
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn degraded_mode_bypasses_the_network() {
    let provider = MockProvider::failing("primary", network_error());
    let config = test_config().with_recovery(
        RecoveryConfig::default()
            .with_consecutive_error_limit(2)
            .with_error_rate_threshold(1.0),
    );
    let (mut orchestrator, _completions) =
        Orchestrator::new(config, vec![provider.shared()]).unwrap();

    let first = orchestrator
        .call("Describe the flood", CallType::NarrativeEvent)
        .await
        .unwrap();
    assert_eq!(first.source, ResponseSource::Offline);
    assert_eq!(provider.call_count(), 2);

    let second = orchestrator
        .call("Describe the drought", CallType::NarrativeEvent)
        .await
        .unwrap();
    assert_eq!(second.source, ResponseSource::Offline);
    assert_eq!(provider.call_count(), 2);
    assert!(orchestrator.status().degraded);
}

#[tokio::test]
async fn requests_past_their_deadline_time_out() {
    let provider = MockProvider::success("primary", "too late");
    let config = test_config().with_queue(QueueConfig::default().with_urgent_timeout_ticks(2));
    let (mut orchestrator, mut completions) =
        Orchestrator::new(config, vec![provider.shared()]).unwrap();

    let id = orchestrator
        .submit("Interpret: open the gates", CallType::DecisionInterpretation, Priority::Urgent)
        .unwrap();
    assert_eq!(orchestrator.process_queue(3).await.unwrap(), 1);

    let delivered = drain(&mut completions);
    assert_eq!(delivered[0].request_id, id);
    let err = delivered[0].result.as_ref().unwrap_err();
    match err.kind() {
        ChroniclerErrorKind::Queue(queue) => assert!(matches!(
            queue.kind(),
            QueueErrorKind::TimedOut { deadline_tick: 2, .. }
        )),
        other => panic!("expected a timeout, got {}", other),
    }
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn retry_past_the_deadline_resolves_offline_with_default_settings() {
    let provider = MockProvider::failing("primary", network_error());
    let config = ChroniclerConfig::default()
        .with_backoff(BackoffConfig::default().with_jitter(false));
    let (mut orchestrator, mut completions) =
        Orchestrator::new(config, vec![provider.shared()]).unwrap();

    let id = orchestrator
        .submit("Interpret: ration the grain", CallType::DecisionInterpretation, Priority::Urgent)
        .unwrap();

    let mut delivered = Vec::new();
    for tick in 0..12 {
        orchestrator.process_queue(tick).await.unwrap();
        delivered.extend(drain(&mut completions));
    }

    // Attempts on ticks 0, 1 and 3; the next retry would land on tick 7
    assert_eq!(provider.call_count(), 3);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].request_id, id);
    assert_eq!(delivered[0].tick, 3);
    let response = delivered[0].result.as_ref().unwrap();
    assert_eq!(response.source, ResponseSource::Offline);
    assert_eq!(orchestrator.queue_depths().total(), 0);
}

#[tokio::test]
async fn dispatched_request_expiring_in_the_queue_still_gets_a_response() {
    let provider = MockProvider::sequence(
        "primary",
        vec![
            MockResponse::Error(network_error()),
            MockResponse::Success("never reached".into()),
        ],
    );
    let config = test_config()
        .with_rate_limit(RateLimitConfig::default().with_requests_per_minute(1))
        .with_queue(QueueConfig::default().with_urgent_timeout_ticks(2));
    let (mut orchestrator, mut completions) =
        Orchestrator::new(config, vec![provider.shared()]).unwrap();

    orchestrator
        .submit("Interpret: seal the gates", CallType::DecisionInterpretation, Priority::Urgent)
        .unwrap();

    // The retry is due on tick 1 but the bucket stays empty
    for tick in 0..3 {
        assert_eq!(orchestrator.process_queue(tick).await.unwrap(), 0);
    }
    assert_eq!(orchestrator.process_queue(3).await.unwrap(), 1);

    let delivered = drain(&mut completions);
    let response = delivered[0].result.as_ref().unwrap();
    assert_eq!(response.source, ResponseSource::Offline);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn urgent_lane_dispatches_first() {
    let provider = MockProvider::success("primary", "ok");
    let (mut orchestrator, mut completions) =
        Orchestrator::new(test_config(), vec![provider.shared()]).unwrap();

    let background = orchestrator
        .submit("Ambient birdsong", CallType::NarrativeContext, Priority::Background)
        .unwrap();
    let urgent = orchestrator
        .submit("Interpret: ration bread", CallType::DecisionInterpretation, Priority::Urgent)
        .unwrap();

    orchestrator.process_queue(0).await.unwrap();
    let order: Vec<_> = drain(&mut completions)
        .into_iter()
        .map(|completion| completion.request_id)
        .collect();
    assert_eq!(order, vec![urgent, background]);
    assert_eq!(
        provider.prompts(),
        vec!["Interpret: ration bread", "Ambient birdsong"]
    );
}

#[tokio::test]
async fn rate_limiter_defers_dispatch_until_refilled() {
    let provider = MockProvider::success("primary", "ok");
    let config = test_config()
        .with_rate_limit(RateLimitConfig::default().with_requests_per_minute(1))
        .with_queue(QueueConfig::default().with_standard_timeout_ticks(100));
    let (mut orchestrator, _completions) =
        Orchestrator::new(config, vec![provider.shared()]).unwrap();

    orchestrator
        .submit("Interpret: build a wall", CallType::DecisionInterpretation, Priority::Urgent)
        .unwrap();
    orchestrator
        .submit("Tell a story", CallType::NpcDialogue, Priority::Standard)
        .unwrap();

    assert_eq!(orchestrator.process_queue(0).await.unwrap(), 1);
    assert_eq!(orchestrator.queue_depths().standard, 1);
    assert_eq!(orchestrator.process_queue(30).await.unwrap(), 0);
    assert_eq!(orchestrator.process_queue(61).await.unwrap(), 1);
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn exceeded_budget_routes_to_offline() {
    let provider = MockProvider::success("paid", "Expensive words");
    let config = test_config().with_pricing(vec![PricingEntry {
        model: "paid-model".into(),
        input_per_1k: 6000.0,
        completion_per_1k: 0.0,
    }]);
    let (mut orchestrator, _completions) =
        Orchestrator::new(config, vec![provider.shared()]).unwrap();

    let first = orchestrator
        .call("Costly prompt", CallType::NpcDialogue)
        .await
        .unwrap();
    assert_eq!(first.source, ResponseSource::Provider);
    assert!((first.cost_usd - 12.0).abs() < 1e-9);
    assert!(orchestrator.usage().is_budget_exceeded());

    let second = orchestrator
        .call("Another prompt", CallType::NpcDialogue)
        .await
        .unwrap();
    assert_eq!(second.source, ResponseSource::Offline);
    assert_eq!(provider.call_count(), 1);
    assert!(orchestrator.status().budget_exceeded);
}

#[tokio::test(start_paused = true)]
async fn stale_entry_is_served_when_providers_fail() {
    let provider = MockProvider::sequence(
        "primary",
        vec![MockResponse::Success("Fresh gossip".into())],
    );
    let (mut orchestrator, _completions) =
        Orchestrator::new(test_config(), vec![provider.shared()]).unwrap();

    orchestrator
        .call("Any gossip?", CallType::NpcDialogue)
        .await
        .unwrap();

    orchestrator.process_queue(100).await.unwrap();
    let response = orchestrator
        .call("Any gossip?", CallType::NpcDialogue)
        .await
        .unwrap();

    assert_eq!(response.source, ResponseSource::StaleCache);
    assert_eq!(response.text, "Fresh gossip");
    assert_eq!(orchestrator.cache().stats().stale_hits, 1);
}

#[tokio::test]
async fn status_reports_every_component() {
    let provider = MockProvider::success("primary", "ok");
    let (mut orchestrator, _completions) =
        Orchestrator::new(test_config(), vec![provider.shared()]).unwrap();

    orchestrator
        .submit("Ambient birdsong", CallType::NarrativeContext, Priority::Background)
        .unwrap();
    let status = orchestrator.status();

    assert_eq!(status.queue.background, 1);
    assert_eq!(status.providers.len(), 1);
    assert_eq!(status.providers[0].name, "primary");
    assert!(!status.degraded);
    assert_eq!(status.tokens_available, 600.0);
    assert_eq!(status.divergences, 0);
}

async fn run_session(
    orchestrator: &mut Orchestrator,
    completions: &mut UnboundedReceiver<Completion>,
    first_prompt: &str,
) -> Vec<(String, u64, u64)> {
    orchestrator
        .submit(first_prompt, CallType::NarrativeEvent, Priority::Standard)
        .unwrap();
    let mut delivered = Vec::new();
    for tick in 0..6 {
        if tick == 3 {
            orchestrator
                .submit("Greet the envoy", CallType::NpcDialogue, Priority::Urgent)
                .unwrap();
        }
        orchestrator.process_queue(tick).await.unwrap();
        delivered.extend(drain(completions));
    }
    delivered
        .into_iter()
        .filter_map(|completion| completion.result.ok())
        .map(|response| {
            (
                response.text,
                response.usage.input_tokens,
                response.usage.completion_tokens,
            )
        })
        .collect()
}

fn scripted_provider() -> MockProvider {
    MockProvider::sequence(
        "primary",
        vec![
            MockResponse::Error(network_error()),
            MockResponse::Success("The river floods the lower fields.".into()),
            MockResponse::Error(ProviderErrorKind::Unauthorized("key revoked".into())),
        ],
    )
}

#[tokio::test]
async fn replay_reproduces_a_recorded_session_without_providers() {
    let config = test_config().with_backoff(BackoffConfig::default());

    let recorder = scripted_provider();
    let (mut recording, mut recorded_completions) =
        Orchestrator::new(config.clone(), vec![recorder.shared()]).unwrap();
    let recorded =
        run_session(&mut recording, &mut recorded_completions, "Describe the flood").await;
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorder.call_count(), 3);
    let log = recording.replay_log().unwrap().clone();
    assert!(log.calls.iter().any(|record| record.random_seed.is_some()));

    let idle = MockProvider::success("primary", "never used");
    let (mut replaying, mut replayed_completions) =
        Orchestrator::replaying(config, vec![idle.shared()], log).unwrap();
    let replayed =
        run_session(&mut replaying, &mut replayed_completions, "Describe the flood").await;

    assert_eq!(replayed, recorded);
    assert_eq!(idle.call_count(), 0);
    assert!(replaying.replay_comparison().unwrap().is_identical());
    assert_eq!(replaying.replay_remaining(), Some(0));
    assert!(replaying.divergences().is_empty());
}

#[tokio::test]
async fn replay_reports_a_changed_prompt_as_divergence() {
    let config = test_config().with_backoff(BackoffConfig::default());

    let recorder = scripted_provider();
    let (mut recording, mut recorded_completions) =
        Orchestrator::new(config.clone(), vec![recorder.shared()]).unwrap();
    run_session(&mut recording, &mut recorded_completions, "Describe the flood").await;
    let log = recording.replay_log().unwrap().clone();

    let idle = MockProvider::success("primary", "never used");
    let (mut replaying, mut replayed_completions) =
        Orchestrator::replaying(config, vec![idle.shared()], log).unwrap();
    replaying
        .submit("Describe the drought", CallType::NarrativeEvent, Priority::Standard)
        .unwrap();
    replaying.process_queue(0).await.unwrap();

    let delivered = drain(&mut replayed_completions);
    let err = delivered[0].result.as_ref().unwrap_err();
    assert!(matches!(err.kind(), ChroniclerErrorKind::Replay(_)));
    assert_eq!(replaying.divergences().len(), 1);
    assert!(matches!(
        replaying.divergences()[0].kind(),
        ReplayErrorKind::Divergence { tick: 0, .. }
    ));
    assert!(!replaying.replay_comparison().unwrap().is_identical());
    assert_eq!(idle.call_count(), 0);
}
