//! Trait definitions for the Chronicler request orchestration layer.
//!
//! The orchestrator is agnostic to transport: anything that can turn a prompt
//! into text and report its token usage can sit in the failover chain.

mod traits;

pub use traits::{LlmProvider, ProviderResult};
