//! Comparing a recorded session with its replay.

use crate::{CallRecord, ReplayLog, ReplayResult};
use chronicler_core::CallType;
use chronicler_error::{ReplayError, ReplayErrorKind};
use std::collections::HashMap;
use tracing::{info, warn};

/// Result of comparing two logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayComparison {
    /// Records that matched position for position
    pub matched: usize,
    /// First difference found, in recorded order
    pub first_mismatch: Option<ReplayErrorKind>,
}

impl ReplayComparison {
    /// Whether outputs and token counts were reproduced exactly.
    pub fn is_identical(&self) -> bool {
        self.first_mismatch.is_none()
    }

    /// Turn a mismatch into an error.
    #[track_caller]
    pub fn into_result(self) -> ReplayResult<usize> {
        match self.first_mismatch {
            None => Ok(self.matched),
            Some(kind) => Err(ReplayError::new(kind)),
        }
    }
}

/// Checks replay fidelity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayValidator;

impl ReplayValidator {
    /// Compare `replayed` against `recorded`, position by position within each
    /// `(tick, call_type)`.
    ///
    /// Prompts must match exactly; outputs and token counts must be
    /// byte-identical. The first mismatch in recorded order is reported.
    pub fn compare(recorded: &ReplayLog, replayed: &ReplayLog) -> ReplayComparison {
        let replayed_index = index_by_key(replayed);
        let mut positions: HashMap<(u64, CallType), usize> = HashMap::new();
        let mut matched = 0;

        for expected in &recorded.calls {
            let key = (expected.tick, expected.call_type);
            let position = positions.entry(key).or_default();
            let actual = replayed_index
                .get(&key)
                .and_then(|records| records.get(*position));
            let current = *position;
            *position += 1;

            let Some(actual) = actual else {
                return mismatch(
                    matched,
                    ReplayErrorKind::MissingRecord {
                        tick: expected.tick,
                        call_type: expected.call_type.to_string(),
                    },
                );
            };

            if actual.prompt != expected.prompt {
                return mismatch(
                    matched,
                    ReplayErrorKind::Divergence {
                        tick: expected.tick,
                        call_type: expected.call_type.to_string(),
                        position: current,
                        expected: expected.prompt.clone(),
                        actual: actual.prompt.clone(),
                    },
                );
            }

            if !same_outcome(expected, actual) {
                return mismatch(
                    matched,
                    ReplayErrorKind::OutputMismatch {
                        tick: expected.tick,
                        call_type: expected.call_type.to_string(),
                        position: current,
                        expected: describe(expected),
                        actual: describe(actual),
                    },
                );
            }
            matched += 1;
        }

        // Anything replayed beyond the recording
        for actual in &replayed.calls {
            let key = (actual.tick, actual.call_type);
            let recorded_count = positions.get(&key).copied().unwrap_or(0);
            let replayed_count = replayed_index.get(&key).map_or(0, Vec::len);
            if replayed_count > recorded_count {
                return mismatch(
                    matched,
                    ReplayErrorKind::UnexpectedRecord {
                        tick: actual.tick,
                        call_type: actual.call_type.to_string(),
                        position: recorded_count,
                    },
                );
            }
        }

        info!(matched, "Replay reproduced recorded session");
        ReplayComparison {
            matched,
            first_mismatch: None,
        }
    }
}

fn index_by_key(log: &ReplayLog) -> HashMap<(u64, CallType), Vec<&CallRecord>> {
    let mut index: HashMap<(u64, CallType), Vec<&CallRecord>> = HashMap::new();
    for record in &log.calls {
        index
            .entry((record.tick, record.call_type))
            .or_default()
            .push(record);
    }
    index
}

fn same_outcome(expected: &CallRecord, actual: &CallRecord) -> bool {
    expected.output == actual.output
        && expected.usage == actual.usage
        && expected.success == actual.success
}

fn describe(record: &CallRecord) -> String {
    format!(
        "{} ({}+{} tokens, success={})",
        record.output, record.usage.input_tokens, record.usage.completion_tokens, record.success
    )
}

fn mismatch(matched: usize, kind: ReplayErrorKind) -> ReplayComparison {
    warn!(error = %kind, matched, "Replay mismatch");
    ReplayComparison {
        matched,
        first_mismatch: Some(kind),
    }
}
