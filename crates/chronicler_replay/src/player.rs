//! Serving a recorded session back in order.

use crate::{CallRecord, ReplayLog, ReplayResult};
use chronicler_core::CallType;
use chronicler_error::{ReplayError, ReplayErrorKind};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, instrument, warn};

/// Plays a [`ReplayLog`] back.
///
/// Each `(tick, call_type)` has its own cursor over the records recorded for
/// it, so calls are answered in exactly their recorded order. Random draws are
/// served per `(tick, purpose)` the same way.
#[derive(Debug, Clone)]
pub struct ReplayPlayer {
    log: ReplayLog,
    calls: HashMap<(u64, CallType), Vec<usize>>,
    cursors: HashMap<(u64, CallType), usize>,
    decisions: HashMap<(u64, String), VecDeque<u64>>,
}

impl ReplayPlayer {
    /// Index a log for playback.
    pub fn new(log: ReplayLog) -> Self {
        let mut calls: HashMap<(u64, CallType), Vec<usize>> = HashMap::new();
        for (index, record) in log.calls.iter().enumerate() {
            calls
                .entry((record.tick, record.call_type))
                .or_default()
                .push(index);
        }

        let mut decisions: HashMap<(u64, String), VecDeque<u64>> = HashMap::new();
        for decision in &log.decisions {
            decisions
                .entry((decision.tick, decision.purpose.clone()))
                .or_default()
                .push_back(decision.value);
        }

        debug!(
            keys = calls.len(),
            decisions = log.decisions.len(),
            "Indexed replay log"
        );
        Self {
            log,
            calls,
            cursors: HashMap::new(),
            decisions,
        }
    }

    /// Seed the log was recorded with.
    pub fn seed(&self) -> u64 {
        self.log.seed
    }

    /// The log being played.
    pub fn log(&self) -> &ReplayLog {
        &self.log
    }

    /// Compare `prompt` against the record at the current position without
    /// consuming it.
    ///
    /// Returns the divergence, or a missing-record error when the log has
    /// nothing left for this key.
    pub fn check_for_divergence(
        &self,
        tick: u64,
        call_type: CallType,
        prompt: &str,
    ) -> Option<ReplayError> {
        let position = self.position(tick, call_type);
        match self.record_at(tick, call_type, position) {
            None => Some(ReplayError::new(ReplayErrorKind::MissingRecord {
                tick,
                call_type: call_type.to_string(),
            })),
            Some(record) if record.prompt != prompt => {
                Some(ReplayError::new(ReplayErrorKind::Divergence {
                    tick,
                    call_type: call_type.to_string(),
                    position,
                    expected: record.prompt.clone(),
                    actual: prompt.to_string(),
                }))
            }
            Some(_) => None,
        }
    }

    /// Consume the next record for `(tick, call_type)`.
    ///
    /// The position advances even when the prompt diverges so later calls
    /// keep their alignment.
    ///
    /// # Errors
    ///
    /// `Divergence` when `prompt` differs from the recorded prompt,
    /// `MissingRecord` when every record for the key has been consumed.
    #[instrument(skip(self, prompt), fields(call_type = %call_type))]
    pub fn next_replay_response(
        &mut self,
        tick: u64,
        call_type: CallType,
        prompt: &str,
    ) -> ReplayResult<CallRecord> {
        if let Some(err) = self.check_for_divergence(tick, call_type, prompt) {
            if matches!(err.kind(), ReplayErrorKind::Divergence { .. }) {
                *self.cursors.entry((tick, call_type)).or_default() += 1;
            }
            warn!(error = %err.kind(), "Replay desynchronized");
            return Err(err);
        }

        let position = self.position(tick, call_type);
        *self.cursors.entry((tick, call_type)).or_default() += 1;
        let record = self
            .record_at(tick, call_type, position)
            .cloned()
            .ok_or_else(|| {
                ReplayError::new(ReplayErrorKind::MissingRecord {
                    tick,
                    call_type: call_type.to_string(),
                })
            })?;
        debug!(position, attempt = record.attempt_number, "Serving recorded call");
        Ok(record)
    }

    /// Consume the next recorded random value for `(tick, purpose)`.
    pub fn next_random(&mut self, tick: u64, purpose: &str) -> ReplayResult<u64> {
        self.decisions
            .get_mut(&(tick, purpose.to_string()))
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| {
                ReplayError::new(ReplayErrorKind::MissingRandomDecision {
                    tick,
                    purpose: purpose.to_string(),
                })
            })
    }

    /// Records not yet consumed.
    pub fn remaining_calls(&self) -> usize {
        self.calls
            .iter()
            .map(|(key, indices)| {
                let consumed = self.cursors.get(key).copied().unwrap_or(0);
                indices.len().saturating_sub(consumed)
            })
            .sum()
    }

    fn position(&self, tick: u64, call_type: CallType) -> usize {
        self.cursors.get(&(tick, call_type)).copied().unwrap_or(0)
    }

    fn record_at(&self, tick: u64, call_type: CallType, position: usize) -> Option<&CallRecord> {
        let index = *self.calls.get(&(tick, call_type))?.get(position)?;
        self.log.calls.get(index)
    }
}
