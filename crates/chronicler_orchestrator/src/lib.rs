//! Request orchestration for the Chronicler settlement simulation.
//!
//! The simulation hands prompts to an [`Orchestrator`] and gets text back,
//! either on the completion channel after [`Orchestrator::process_queue`]
//! resolves a queued submission, or directly from [`Orchestrator::call`].
//!
//! Between the two sit:
//! - [`PriorityRequestQueue`]: three bounded lanes with deduplication and
//!   timeout eviction
//! - the provider-wide token bucket and the error recovery manager from
//!   `chronicler_rate_limit`
//! - the response cache from `chronicler_cache`
//! - [`FailoverChain`]: providers in priority order with per-provider health
//!   and the offline fallback
//! - usage accounting from `chronicler_usage` and the replay log from
//!   `chronicler_replay`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod failover;
mod orchestrator;
mod queue;

pub use config::{ChroniclerConfig, PricingEntry, TimingConfig, TimingConfigBuilder};
pub use failover::{
    ChainFailure, FailoverChain, FailoverConfig, FailoverConfigBuilder, ProviderHealth,
    ProviderSuccess,
};
pub use orchestrator::{
    Completion, JITTER_PURPOSE, OFFLINE_TEMPLATE_PURPOSE, Orchestrator, OrchestratorStatus,
};
pub use queue::{PriorityRequestQueue, QueueConfig, QueueConfigBuilder, QueueDepths};
