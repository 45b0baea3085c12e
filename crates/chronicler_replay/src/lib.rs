//! Deterministic replay for simulation sessions.
//!
//! While recording, every provider attempt becomes a [`CallRecord`] and every
//! random value consumed by jitter or offline template selection becomes a
//! [`RandomDecisionRecord`], both keyed by simulation tick. While replaying,
//! the [`ReplayPlayer`] serves those records back in their recorded order so a
//! session reproduces byte-identical outputs without touching the network.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod logger;
mod player;
mod record;
mod validator;

pub use config::{ReplayConfig, ReplayConfigBuilder, ReplayMode};
pub use logger::ReplayLogger;
pub use player::ReplayPlayer;
pub use record::{CallRecord, RandomDecisionRecord, ReplayLog};
pub use validator::{ReplayComparison, ReplayValidator};

/// Result type for replay operations.
pub type ReplayResult<T> = Result<T, chronicler_error::ReplayError>;
