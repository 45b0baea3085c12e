//! Top-level error wrapper types.

use crate::{BuilderError, ConfigError, ProviderError, QueueError, ReplayError, UsageError};

/// Every error condition the workspace can surface.
///
/// # Examples
///
/// ```
/// use chronicler_error::{ChroniclerError, ConfigError};
///
/// let err: ChroniclerError = ConfigError::new("missing provider").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ChroniclerErrorKind {
    /// Provider call failed
    #[from(ProviderError)]
    Provider(ProviderError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Request rejected by the queue or dropped on timeout
    #[from(QueueError)]
    Queue(QueueError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
    /// Replay logging or playback error
    #[from(ReplayError)]
    Replay(ReplayError),
    /// Usage ledger error
    #[from(UsageError)]
    Usage(UsageError),
}

/// Chronicler error with kind discrimination.
///
/// # Examples
///
/// ```
/// use chronicler_error::{ChroniclerErrorKind, ChroniclerResult, ConfigError};
///
/// fn might_fail() -> ChroniclerResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// let err = might_fail().unwrap_err();
/// assert!(matches!(err.kind(), ChroniclerErrorKind::Config(_)));
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Chronicler Error: {}", _0)]
pub struct ChroniclerError(Box<ChroniclerErrorKind>);

impl ChroniclerError {
    /// Create a new error from a kind.
    pub fn new(kind: ChroniclerErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ChroniclerErrorKind {
        &self.0
    }
}

impl<T> From<T> for ChroniclerError
where
    T: Into<ChroniclerErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Chronicler operations.
pub type ChroniclerResult<T> = std::result::Result<T, ChroniclerError>;
