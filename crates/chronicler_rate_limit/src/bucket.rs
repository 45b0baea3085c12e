//! Token bucket admission control.

use chronicler_core::Clock;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, trace};

/// Provider-wide request budget.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct RateLimitConfig {
    /// Requests admitted per minute; also the bucket capacity
    #[serde(default = "default_requests_per_minute")]
    requests_per_minute: u32,
}

fn default_requests_per_minute() -> u32 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

/// Lazily refilled token bucket.
///
/// Capacity is `requests_per_minute` tokens, refilled continuously at
/// `requests_per_minute / 60` tokens per second of elapsed clock time.
/// Refill happens on every check; there is no background timer.
///
/// # Example
///
/// ```
/// use chronicler_core::ManualClock;
/// use chronicler_rate_limit::TokenBucket;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let mut bucket = TokenBucket::new(2, Arc::new(clock.clone()));
/// assert!(bucket.can_make_request());
/// assert!(bucket.can_make_request());
/// assert!(!bucket.can_make_request());
///
/// clock.advance(Duration::from_secs(30));
/// assert!(bucket.can_make_request());
/// ```
#[derive(Debug, Clone)]
pub struct TokenBucket {
    max_tokens: f64,
    tokens_available: f64,
    refill_per_second: f64,
    last_refill: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenBucket {
    /// Create a full bucket admitting `requests_per_minute` calls per minute.
    ///
    /// A zero budget is raised to one request per minute.
    #[instrument(skip(clock))]
    pub fn new(requests_per_minute: u32, clock: Arc<dyn Clock>) -> Self {
        let max_tokens = f64::from(requests_per_minute.max(1));
        debug!(max_tokens, "Creating token bucket");
        Self {
            max_tokens,
            tokens_available: max_tokens,
            refill_per_second: max_tokens / 60.0,
            last_refill: clock.now(),
            clock,
        }
    }

    /// Create a bucket from configuration.
    pub fn from_config(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.requests_per_minute, clock)
    }

    fn refill(&mut self) {
        let now = self.clock.now();
        let elapsed = now.saturating_sub(self.last_refill);
        if elapsed > Duration::ZERO {
            self.tokens_available = (self.tokens_available
                + elapsed.as_secs_f64() * self.refill_per_second)
                .min(self.max_tokens);
            self.last_refill = now;
        }
    }

    /// Refill, then spend one token if at least one is available.
    pub fn can_make_request(&mut self) -> bool {
        self.refill();
        if self.tokens_available >= 1.0 {
            self.tokens_available -= 1.0;
            trace!(remaining = self.tokens_available, "Token spent");
            true
        } else {
            debug!(
                tokens = self.tokens_available,
                "Rate limited, no token available"
            );
            false
        }
    }

    /// Refill, then report whether a token is available without spending it.
    pub fn has_capacity(&mut self) -> bool {
        self.refill();
        self.tokens_available >= 1.0
    }

    /// Seconds until one full token is available; zero if one already is.
    pub fn wait_time_seconds(&mut self) -> f64 {
        self.refill();
        ((1.0 - self.tokens_available) / self.refill_per_second).max(0.0)
    }

    /// [`Self::wait_time_seconds`] as a duration.
    pub fn wait_time(&mut self) -> Duration {
        Duration::from_secs_f64(self.wait_time_seconds())
    }

    /// Current (refilled) token count.
    pub fn tokens_available(&mut self) -> f64 {
        self.refill();
        self.tokens_available
    }

    /// Bucket capacity.
    pub fn max_tokens(&self) -> f64 {
        self.max_tokens
    }

    /// Tokens regained per second.
    pub fn refill_per_second(&self) -> f64 {
        self.refill_per_second
    }
}
