//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the chronicler binary.

mod commands;
mod replay;
mod simulate;
mod usage;

pub use commands::{Cli, Commands};
pub use replay::replay_session;
pub use simulate::simulate;
pub use usage::show_usage;

use chronicler::{ChroniclerConfig, ChroniclerResult};
use std::path::Path;

/// Explicit config file, or the layered defaults.
fn load_config(path: Option<&Path>) -> ChroniclerResult<ChroniclerConfig> {
    match path {
        Some(path) => ChroniclerConfig::from_file(path),
        None => ChroniclerConfig::load(),
    }
}
