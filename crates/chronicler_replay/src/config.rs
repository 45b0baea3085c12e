//! Replay settings.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whether a session records, replays, or neither.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReplayMode {
    /// No log is kept
    Off,
    /// Calls go to providers and are logged
    #[default]
    Record,
    /// Calls are answered from a previously recorded log
    Replay,
}

/// Replay configuration.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct ReplayConfig {
    /// Session mode
    #[serde(default)]
    mode: ReplayMode,

    /// Seed for jitter and offline template draws while recording
    #[serde(default)]
    seed: u64,

    /// Where the log is saved (record) or read from (replay)
    #[serde(default)]
    #[setters(strip_option)]
    log_path: Option<PathBuf>,

    /// Save the log every N ticks in addition to session end
    #[serde(default)]
    #[setters(strip_option)]
    flush_every_ticks: Option<u64>,
}
