//! Usage ledger errors.

/// Specific usage ledger error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum UsageErrorKind {
    /// Usage reported for a model with no registered pricing
    #[display("No pricing registered for model: {}", _0)]
    UnknownModel(String),
    /// Filesystem failure while exporting a report
    #[display("Usage report I/O failed: {}", _0)]
    Io(String),
    /// Report could not be encoded or decoded
    #[display("Usage report serialization failed: {}", _0)]
    Serialization(String),
}

/// Usage error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Usage Error: {} at line {} in {}", kind, line, file)]
pub struct UsageError {
    kind: UsageErrorKind,
    line: u32,
    file: &'static str,
}

impl UsageError {
    /// Create a new usage error with caller location tracking.
    #[track_caller]
    pub fn new(kind: UsageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &UsageErrorKind {
        &self.kind
    }
}
