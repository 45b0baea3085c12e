//! Core data types for the Chronicler request orchestration layer.
//!
//! This crate provides the request model shared by the queue, cache, replay log
//! and orchestrator, plus the time and randomness seams that keep a simulation
//! session reproducible.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod call_type;
mod clock;
mod key;
mod random;
mod request;
mod response;

pub use call_type::CallType;
pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{ContentKey, normalize_prompt};
pub use random::{RandomSource, ScriptedRandom, SeededRandom, derive_seed, unit_from_bits};
pub use request::{Priority, Request, RequestId};
pub use response::{
    GenerationResponse, OFFLINE_PROVIDER_NAME, ProviderResponse, ResponseSource, TokenUsage,
};
