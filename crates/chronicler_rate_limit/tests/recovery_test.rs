//! Tests for failure classification and degraded mode.

use chronicler_core::{ManualClock, ScriptedRandom};
use chronicler_error::{ErrorCategory, ProviderError, ProviderErrorKind};
use chronicler_rate_limit::{BackoffConfig, ErrorRecoveryManager, RecoveryAction, RecoveryConfig};
use std::sync::Arc;
use std::time::Duration;

fn manager(config: RecoveryConfig, clock: &ManualClock) -> ErrorRecoveryManager {
    ErrorRecoveryManager::new(
        config,
        BackoffConfig::default().with_jitter(false),
        Arc::new(clock.clone()),
    )
}

fn lenient() -> RecoveryConfig {
    RecoveryConfig::default()
        .with_consecutive_error_limit(100)
        .with_error_rate_threshold(1.0)
}

fn network() -> ProviderError {
    ProviderError::new(ProviderErrorKind::Network("connection reset".into()))
}

#[test]
fn non_retryable_fails_immediately() {
    let clock = ManualClock::new();
    let mut recovery = manager(lenient(), &clock);
    let mut random = ScriptedRandom::new(vec![]);

    let err = ProviderError::new(ProviderErrorKind::Unauthorized("bad key".into()));
    assert_eq!(recovery.handle_error(&err, 0, &mut random), RecoveryAction::Fail);
}

#[test]
fn retryable_errors_back_off_until_exhausted() {
    let clock = ManualClock::new();
    let mut recovery = manager(lenient().with_max_retries(3), &clock);
    let mut random = ScriptedRandom::new(vec![]);

    assert_eq!(
        recovery.handle_error(&network(), 0, &mut random),
        RecoveryAction::RetryLater(Duration::from_millis(1000))
    );
    assert_eq!(
        recovery.handle_error(&network(), 1, &mut random),
        RecoveryAction::RetryLater(Duration::from_millis(2000))
    );
    assert_eq!(
        recovery.handle_error(&network(), 2, &mut random),
        RecoveryAction::RetryLater(Duration::from_millis(4000))
    );
    assert_eq!(
        recovery.handle_error(&network(), 3, &mut random),
        RecoveryAction::UseFallback
    );
}

#[test]
fn exhausted_without_offline_fallback_fails() {
    let clock = ManualClock::new();
    let config = lenient().with_max_retries(0).with_fallback_to_offline(false);
    let mut recovery = manager(config, &clock);
    let mut random = ScriptedRandom::new(vec![]);
    assert_eq!(
        recovery.handle_error(&network(), 0, &mut random),
        RecoveryAction::Fail
    );
}

#[test]
fn malformed_payload_retries_immediately_once() {
    let clock = ManualClock::new();
    let mut recovery = manager(lenient(), &clock);
    let mut random = ScriptedRandom::new(vec![]);
    let err = ProviderError::new(ProviderErrorKind::Parse("unexpected eof".into()));

    assert_eq!(
        recovery.handle_error(&err, 0, &mut random),
        RecoveryAction::RetryImmediately
    );
    assert!(matches!(
        recovery.handle_error(&err, 1, &mut random),
        RecoveryAction::RetryLater(_)
    ));
}

#[test]
fn consecutive_errors_enter_degraded_mode_until_cooldown() {
    let clock = ManualClock::new();
    let config = RecoveryConfig::default()
        .with_consecutive_error_limit(3)
        .with_min_window_samples(100)
        .with_degraded_cooldown_secs(60);
    let mut recovery = manager(config, &clock);
    let mut random = ScriptedRandom::new(vec![]);

    recovery.handle_error(&network(), 0, &mut random);
    recovery.handle_error(&network(), 0, &mut random);
    assert!(!recovery.is_degraded());
    assert_eq!(
        recovery.handle_error(&network(), 0, &mut random),
        RecoveryAction::UseFallback
    );
    assert!(recovery.is_degraded());
    assert_eq!(recovery.degraded_entries(), 1);

    clock.advance(Duration::from_secs(59));
    assert!(recovery.is_degraded());
    clock.advance(Duration::from_secs(1));
    assert!(!recovery.is_degraded(), "cooldown elapsed, probe allowed");

    // A successful probe clears the streak
    recovery.record_success();
    assert_eq!(recovery.consecutive_errors(), 0);
    assert!(!recovery.is_degraded());
}

#[test]
fn failed_probe_reenters_degraded_mode() {
    let clock = ManualClock::new();
    let config = RecoveryConfig::default()
        .with_consecutive_error_limit(2)
        .with_min_window_samples(100)
        .with_degraded_cooldown_secs(10);
    let mut recovery = manager(config, &clock);
    let mut random = ScriptedRandom::new(vec![]);

    recovery.handle_error(&network(), 0, &mut random);
    recovery.handle_error(&network(), 0, &mut random);
    assert!(recovery.is_degraded());

    clock.advance(Duration::from_secs(10));
    assert!(!recovery.is_degraded());
    recovery.handle_error(&network(), 0, &mut random);
    assert!(recovery.is_degraded());
    assert_eq!(recovery.degraded_entries(), 2);
}

#[test]
fn error_rate_over_window_trips_degraded_mode() {
    let clock = ManualClock::new();
    let config = RecoveryConfig::default()
        .with_error_window(4)
        .with_min_window_samples(4)
        .with_error_rate_threshold(0.5)
        .with_consecutive_error_limit(100);
    let mut recovery = manager(config, &clock);
    let mut random = ScriptedRandom::new(vec![]);

    recovery.record_success();
    recovery.handle_error(&network(), 0, &mut random);
    recovery.record_success();
    recovery.handle_error(&network(), 0, &mut random);
    // 2 of 4 is not above 0.5
    assert!(!recovery.is_degraded());

    recovery.handle_error(&network(), 0, &mut random);
    // Oldest outcome dropped, 3 of 4 failed
    assert!(recovery.error_rate() > 0.5);
    assert!(recovery.is_degraded());
}

#[test]
fn recent_errors_window_is_bounded() {
    let clock = ManualClock::new();
    let mut recovery = manager(lenient().with_error_window(3), &clock);
    let mut random = ScriptedRandom::new(vec![]);
    for attempt in 0..5 {
        clock.advance(Duration::from_secs(1));
        recovery.handle_error(&network(), attempt, &mut random);
    }
    let recent: Vec<_> = recovery.recent_errors().collect();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].attempt_number, 2);
    assert_eq!(recent[2].category, ErrorCategory::Network);
    assert_eq!(recent[2].at, Duration::from_secs(5));
    assert_eq!(recovery.total_errors(), 5);
}
