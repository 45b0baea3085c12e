//! Tests for token bucket admission.

use chronicler_core::ManualClock;
use chronicler_rate_limit::{RateLimitConfig, TokenBucket};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn bucket_admits_exactly_capacity_without_elapsed_time() {
    let clock = ManualClock::new();
    let mut bucket = TokenBucket::new(10, Arc::new(clock));

    for i in 0..10 {
        assert!(bucket.can_make_request(), "request {} should be admitted", i);
    }
    assert!(!bucket.can_make_request(), "11th request must be rejected");
}

#[test]
fn bucket_refills_at_capacity_per_minute() {
    let clock = ManualClock::new();
    let mut bucket = TokenBucket::new(60, Arc::new(clock.clone()));
    for _ in 0..60 {
        assert!(bucket.can_make_request());
    }
    assert!(!bucket.can_make_request());

    // 60 rpm refills one token per second
    clock.advance(Duration::from_millis(999));
    assert!(!bucket.can_make_request());
    clock.advance(Duration::from_millis(1));
    assert!(bucket.can_make_request());
}

#[test]
fn refill_never_exceeds_capacity() {
    let clock = ManualClock::new();
    let mut bucket = TokenBucket::new(5, Arc::new(clock.clone()));
    clock.advance(Duration::from_secs(3600));
    assert_eq!(bucket.tokens_available(), 5.0);
}

#[test]
fn wait_time_reflects_deficit() {
    let clock = ManualClock::new();
    let mut bucket = TokenBucket::new(30, Arc::new(clock.clone()));
    assert_eq!(bucket.wait_time_seconds(), 0.0);

    for _ in 0..30 {
        assert!(bucket.can_make_request());
    }
    // 30 rpm = 0.5 tokens/s, so a full token takes two seconds
    assert!((bucket.wait_time_seconds() - 2.0).abs() < 1e-9);

    clock.advance(Duration::from_secs(1));
    assert!((bucket.wait_time_seconds() - 1.0).abs() < 1e-9);
}

#[test]
fn has_capacity_does_not_spend() {
    let clock = ManualClock::new();
    let mut bucket = TokenBucket::new(1, Arc::new(clock));
    assert!(bucket.has_capacity());
    assert!(bucket.has_capacity());
    assert!(bucket.can_make_request());
    assert!(!bucket.has_capacity());
}

#[test]
fn config_defaults_to_sixty_rpm() {
    let config: RateLimitConfig = toml::from_str("").unwrap();
    assert_eq!(*config.requests_per_minute(), 60);

    let clock = ManualClock::new();
    let bucket = TokenBucket::from_config(&config.with_requests_per_minute(12), Arc::new(clock));
    assert_eq!(bucket.max_tokens(), 12.0);
    assert!((bucket.refill_per_second() - 0.2).abs() < 1e-12);
}
