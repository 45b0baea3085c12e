//! Error types for the Chronicler library.
//!
//! This crate provides the foundation error types used throughout the Chronicler workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use chronicler_error::{ChroniclerResult, ConfigError};
//!
//! fn load() -> ChroniclerResult<u32> {
//!     Err(ConfigError::new("no providers configured"))?
//! }
//!
//! assert!(load().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod error;
mod provider;
mod queue;
mod replay;
mod usage;

pub use builder::{BuilderError, BuilderErrorKind};
pub use config::ConfigError;
pub use error::{ChroniclerError, ChroniclerErrorKind, ChroniclerResult};
pub use provider::{ErrorCategory, ProviderError, ProviderErrorKind, RetryableError};
pub use queue::{QueueError, QueueErrorKind};
pub use replay::{ReplayError, ReplayErrorKind};
pub use usage::{UsageError, UsageErrorKind};
