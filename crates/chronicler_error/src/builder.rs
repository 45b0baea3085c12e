//! Errors raised when a `derive_builder` builder cannot produce its value.

use derive_builder::UninitializedFieldError;

/// Why a builder refused to build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum BuilderErrorKind {
    /// A field without a default was never set
    #[display("Required field '{}' was not set", _0)]
    MissingField(&'static str),

    /// A field was set to a value the target type rejects
    #[display("Invalid value: {}", _0)]
    InvalidValue(String),
}

/// Builder error with location tracking.
///
/// # Examples
///
/// ```
/// use chronicler_error::{BuilderError, BuilderErrorKind};
///
/// let err = BuilderError::new(BuilderErrorKind::MissingField("model"));
/// assert_eq!(err.kind(), &BuilderErrorKind::MissingField("model"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Builder Error: {} at line {} in {}", kind, line, file)]
pub struct BuilderError {
    kind: BuilderErrorKind,
    line: u32,
    file: &'static str,
}

impl BuilderError {
    /// Create a new builder error with caller location tracking.
    #[track_caller]
    pub fn new(kind: BuilderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &BuilderErrorKind {
        &self.kind
    }
}

impl From<UninitializedFieldError> for BuilderError {
    #[track_caller]
    fn from(err: UninitializedFieldError) -> Self {
        Self::new(BuilderErrorKind::MissingField(err.field_name()))
    }
}

/// Messages returned by a builder's `validate` hook.
impl From<String> for BuilderError {
    #[track_caller]
    fn from(msg: String) -> Self {
        Self::new(BuilderErrorKind::InvalidValue(msg))
    }
}
