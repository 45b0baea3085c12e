//! Chronicler - text generation orchestration for settlement simulations
//!
//! Chronicler sits between a tick-driven simulation and one or more text
//! generation providers. It queues requests by priority, keeps the providers
//! under their rate limits, retries and fails over on errors, falls back to
//! offline templates when the network is unusable, caches responses, tracks
//! spend, and records every call so a session can be replayed exactly.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use chronicler::{CallType, ChroniclerConfig, Orchestrator, Priority};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ChroniclerConfig::load()?;
//!     let (mut orchestrator, mut completions) = Orchestrator::from_config(config)?;
//!
//!     orchestrator.submit("Greet the traveler", CallType::NpcDialogue, Priority::Standard)?;
//!     orchestrator.process_queue(0).await?;
//!
//!     while let Ok(completion) = completions.try_recv() {
//!         println!("{:?}", completion.result);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Cargo Features
//!
//! - `observability` (default) - tracing subscriber with an OpenTelemetry span exporter
//!
//! # Architecture
//!
//! - `chronicler_core` - requests, priorities, responses, clocks, random sources
//! - `chronicler_error` - error types
//! - `chronicler_interface` - the `LlmProvider` trait
//! - `chronicler_rate_limit` - token bucket, tier quotas, backoff, error recovery
//! - `chronicler_cache` - TTL and LRU response cache
//! - `chronicler_usage` - usage ledger, pricing, budget
//! - `chronicler_replay` - replay logging, playback, validation
//! - `chronicler_models` - offline and OpenAI-compatible providers
//! - `chronicler_orchestrator` - queue, failover chain, orchestrator, configuration
//!
//! This crate re-exports everything for convenience.

pub use chronicler_cache::*;
pub use chronicler_core::*;
pub use chronicler_error::*;
pub use chronicler_interface::*;
pub use chronicler_models::{
    OFFLINE_MODEL_NAME, OfflineProvider, OpenAiCompatibleProvider, ProviderConfig,
    ProviderConfigBuilder, ProviderKind, build_provider,
};
pub use chronicler_orchestrator::*;
pub use chronicler_rate_limit::*;
pub use chronicler_replay::*;
pub use chronicler_usage::*;

mod session;

pub use session::{SessionSummary, SettlementScript, ScriptedRequest, run_session};

#[cfg(feature = "observability")]
mod observability;

#[cfg(feature = "observability")]
pub use observability::{
    ObservabilityConfig, init_observability, init_observability_with_config,
    shutdown_observability,
};
