//! Per-provider tier quotas using governor.
//!
//! The token bucket budgets the whole orchestrator; a provider may also carry
//! its own, stricter tier limit. The GCRA limiter here enforces that limit
//! without blocking: a provider over quota is skipped for the attempt.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Optional requests-per-minute limit for one provider.
#[derive(Clone, Default)]
pub struct ProviderQuota {
    requests_per_minute: Option<u32>,
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl std::fmt::Debug for ProviderQuota {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderQuota")
            .field("requests_per_minute", &self.requests_per_minute)
            .finish()
    }
}

impl ProviderQuota {
    /// Quota allowing `requests_per_minute` calls; `None` or zero means unlimited.
    pub fn per_minute(requests_per_minute: Option<u32>) -> Self {
        let limiter = requests_per_minute
            .and_then(NonZeroU32::new)
            .map(|n| Arc::new(GovernorRateLimiter::direct(Quota::per_minute(n))));
        Self {
            requests_per_minute,
            limiter,
        }
    }

    /// No limit.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Configured limit, if any.
    pub fn requests_per_minute(&self) -> Option<u32> {
        self.requests_per_minute
    }

    /// Spend one cell of quota if available.
    pub fn try_acquire(&self) -> bool {
        match &self.limiter {
            None => true,
            Some(limiter) => {
                let allowed = limiter.check().is_ok();
                if !allowed {
                    debug!(
                        rpm = ?self.requests_per_minute,
                        "Provider quota exhausted"
                    );
                }
                allowed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_quota_always_admits() {
        let quota = ProviderQuota::unlimited();
        for _ in 0..1000 {
            assert!(quota.try_acquire());
        }
    }

    #[test]
    fn burst_is_bounded_by_rpm() {
        let quota = ProviderQuota::per_minute(Some(3));
        assert!(quota.try_acquire());
        assert!(quota.try_acquire());
        assert!(quota.try_acquire());
        assert!(!quota.try_acquire());
    }
}
