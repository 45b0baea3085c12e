//! Tests for retry delay calculation.

use chronicler_core::{RandomSource, ScriptedRandom};
use chronicler_rate_limit::{BackoffCalculator, BackoffConfig, BackoffStrategy};
use std::time::Duration;

fn no_jitter(strategy: BackoffStrategy) -> BackoffCalculator {
    BackoffCalculator::new(
        BackoffConfig::default()
            .with_strategy(strategy)
            .with_base_delay_ms(1000)
            .with_max_delay_ms(30_000)
            .with_jitter(false),
    )
}

fn delays(calculator: &BackoffCalculator, attempts: std::ops::Range<u32>) -> Vec<u64> {
    let mut random = ScriptedRandom::new(vec![]);
    attempts
        .map(|a| calculator.calculate_delay(a, &mut random).as_millis() as u64)
        .collect()
}

#[test]
fn exponential_doubles_from_base() {
    let calculator = no_jitter(BackoffStrategy::Exponential);
    assert_eq!(delays(&calculator, 0..4), vec![1000, 2000, 4000, 8000]);
}

#[test]
fn exponential_is_capped() {
    let calculator = BackoffCalculator::new(
        BackoffConfig::default()
            .with_base_delay_ms(1000)
            .with_max_delay_ms(5000)
            .with_jitter(false),
    );
    assert_eq!(delays(&calculator, 0..5), vec![1000, 2000, 4000, 5000, 5000]);
}

#[test]
fn linear_and_fixed_strategies() {
    assert_eq!(
        delays(&no_jitter(BackoffStrategy::Linear), 0..4),
        vec![1000, 2000, 3000, 4000]
    );
    assert_eq!(
        delays(&no_jitter(BackoffStrategy::Fixed), 0..4),
        vec![1000, 1000, 1000, 1000]
    );
}

#[test]
fn jitter_stays_within_factor() {
    let calculator = BackoffCalculator::new(
        BackoffConfig::default()
            .with_base_delay_ms(1000)
            .with_jitter(true)
            .with_jitter_factor(0.2),
    );
    // unit 0.0 -> -20%, unit 0.5 -> 0%, unit 0.75 -> +10%
    let mut random = ScriptedRandom::from_units(&[0.0, 0.5, 0.75]);
    assert_eq!(calculator.calculate_delay(0, &mut random), Duration::from_millis(800));
    assert_eq!(calculator.calculate_delay(0, &mut random), Duration::from_millis(1000));
    assert_eq!(calculator.calculate_delay(1, &mut random), Duration::from_millis(2200));
}

#[test]
fn jitter_is_reproducible_from_the_same_draws() {
    let calculator = BackoffCalculator::new(BackoffConfig::default());
    let mut first = ScriptedRandom::new(vec![0x1234_5678_9abc_def0, 42]);
    let mut second = first.clone();
    for attempt in 0..2 {
        assert_eq!(
            calculator.calculate_delay(attempt, &mut first),
            calculator.calculate_delay(attempt, &mut second)
        );
    }
}

#[test]
fn disabled_jitter_consumes_no_randomness() {
    let calculator = no_jitter(BackoffStrategy::Exponential);
    let mut random = ScriptedRandom::new(vec![1, 2, 3]);
    calculator.calculate_delay(0, &mut random);
    assert_eq!(random.next_u64(), 1);
}
