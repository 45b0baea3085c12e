//! Replay logging and playback errors.

/// Specific replay error conditions.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ReplayErrorKind {
    /// The prompt presented during replay differs from the recorded one
    #[display(
        "Replay diverged at tick {} ({}) position {}: expected {:?}, got {:?}",
        tick,
        call_type,
        position,
        expected,
        actual
    )]
    Divergence {
        /// Simulation tick of the call
        tick: u64,
        /// Call-type of the call
        call_type: String,
        /// Zero-based position among records for this (tick, call-type)
        position: usize,
        /// Prompt that was recorded
        expected: String,
        /// Prompt presented during replay
        actual: String,
    },
    /// A replayed call produced different output or token counts
    #[display(
        "Replay output differs at tick {} ({}) position {}: expected {:?}, got {:?}",
        tick,
        call_type,
        position,
        expected,
        actual
    )]
    OutputMismatch {
        /// Simulation tick of the call
        tick: u64,
        /// Call-type of the call
        call_type: String,
        /// Zero-based position among records for this (tick, call-type)
        position: usize,
        /// Output and token counts that were recorded
        expected: String,
        /// Output and token counts produced during replay
        actual: String,
    },
    /// Replay produced a call the recording does not have
    #[display("Unexpected call at tick {} ({}) position {}", tick, call_type, position)]
    UnexpectedRecord {
        /// Simulation tick of the call
        tick: u64,
        /// Call-type of the call
        call_type: String,
        /// Zero-based position among records for this (tick, call-type)
        position: usize,
    },
    /// No unconsumed record exists for this (tick, call-type)
    #[display("No recorded call left for tick {} ({})", tick, call_type)]
    MissingRecord {
        /// Simulation tick of the call
        tick: u64,
        /// Call-type of the call
        call_type: String,
    },
    /// No unconsumed random decision exists for this (tick, purpose)
    #[display("No recorded random decision left for tick {} ({})", tick, purpose)]
    MissingRandomDecision {
        /// Simulation tick of the draw
        tick: u64,
        /// What the draw was used for
        purpose: String,
    },
    /// Filesystem failure while saving or loading a log
    #[display("Replay log I/O failed: {}", _0)]
    Io(String),
    /// Log could not be encoded or decoded
    #[display("Replay log serialization failed: {}", _0)]
    Serialization(String),
}

/// Replay error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Replay Error: {} at line {} in {}", kind, line, file)]
pub struct ReplayError {
    kind: ReplayErrorKind,
    line: u32,
    file: &'static str,
}

impl ReplayError {
    /// Create a new replay error with caller location tracking.
    #[track_caller]
    pub fn new(kind: ReplayErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ReplayErrorKind {
        &self.kind
    }

    /// True when this error reports a desynchronized replay.
    pub fn is_divergence(&self) -> bool {
        matches!(
            self.kind,
            ReplayErrorKind::Divergence { .. }
                | ReplayErrorKind::OutputMismatch { .. }
                | ReplayErrorKind::UnexpectedRecord { .. }
                | ReplayErrorKind::MissingRecord { .. }
                | ReplayErrorKind::MissingRandomDecision { .. }
        )
    }
}
