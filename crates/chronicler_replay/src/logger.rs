//! Append-only session recorder.

use crate::{CallRecord, RandomDecisionRecord, ReplayLog, ReplayResult};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Records provider attempts and random draws for a session.
///
/// The log is held in memory and written out by [`save`](Self::save), or
/// periodically by [`maybe_flush`](Self::maybe_flush) when a flush interval
/// and path are configured.
#[derive(Debug, Clone)]
pub struct ReplayLogger {
    log: ReplayLog,
    path: Option<PathBuf>,
    flush_every_ticks: Option<u64>,
    last_flush_tick: u64,
}

impl ReplayLogger {
    /// Start recording a session seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            log: ReplayLog::new(seed),
            path: None,
            flush_every_ticks: None,
            last_flush_tick: 0,
        }
    }

    /// Save to `path` on [`save`](Self::save) and periodic flushes.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Flush every `ticks` ticks. Zero disables periodic flushing.
    pub fn with_flush_every_ticks(mut self, ticks: u64) -> Self {
        self.flush_every_ticks = (ticks > 0).then_some(ticks);
        self
    }

    /// Append a provider attempt.
    #[instrument(skip_all, fields(tick = record.tick, call_type = %record.call_type, attempt = record.attempt_number))]
    pub fn record_call(&mut self, record: CallRecord) {
        debug!(
            provider = %record.provider,
            success = record.success,
            "Logged call"
        );
        self.log.calls.push(record);
    }

    /// Append a random draw.
    pub fn record_decision(&mut self, tick: u64, purpose: impl Into<String>, value: u64) {
        let purpose = purpose.into();
        debug!(tick, purpose = %purpose, value, "Logged random decision");
        self.log.decisions.push(RandomDecisionRecord {
            tick,
            purpose,
            value,
        });
    }

    /// Save if a flush interval is configured and has elapsed by `tick`.
    ///
    /// Returns whether a save happened.
    pub fn maybe_flush(&mut self, tick: u64) -> ReplayResult<bool> {
        let Some(every) = self.flush_every_ticks else {
            return Ok(false);
        };
        if self.path.is_none() || tick.saturating_sub(self.last_flush_tick) < every {
            return Ok(false);
        }
        self.save()?;
        self.last_flush_tick = tick;
        Ok(true)
    }

    /// Save to the configured path. Does nothing without a path.
    pub fn save(&self) -> ReplayResult<()> {
        match &self.path {
            Some(path) => self.log.save(path),
            None => Ok(()),
        }
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ReplayResult<()> {
        self.log.save(path)
    }

    /// Configured save path.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The log recorded so far.
    pub fn log(&self) -> &ReplayLog {
        &self.log
    }

    /// Take the recorded log.
    pub fn into_log(self) -> ReplayLog {
        self.log
    }
}
