//! Rate limiting, retry backoff and failure recovery.
//!
//! This crate holds the admission and failure-handling policy that sits
//! between the simulation's request queue and the network providers:
//!
//! - [`TokenBucket`] gates every outbound call (retries included) against a
//!   provider-wide requests-per-minute budget.
//! - [`ProviderQuota`] enforces an individual provider's own tier limit.
//! - [`BackoffCalculator`] turns an attempt number into a retry delay.
//! - [`ErrorRecoveryManager`] classifies failures, decides what happens next,
//!   and tracks degraded mode.

mod backoff;
mod bucket;
mod quota;
mod recovery;

pub use backoff::{
    BackoffCalculator, BackoffConfig, BackoffConfigBuilder, BackoffStrategy,
};
pub use bucket::{RateLimitConfig, RateLimitConfigBuilder, TokenBucket};
pub use quota::ProviderQuota;
pub use recovery::{
    ErrorRecord, ErrorRecoveryManager, RecoveryAction, RecoveryConfig, RecoveryConfigBuilder,
};
