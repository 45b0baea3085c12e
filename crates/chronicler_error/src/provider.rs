//! Provider failure taxonomy and retry classification.

use serde::{Deserialize, Serialize};

/// The failure categories recorded in the error window and replay log.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Connection-level failure
    #[display("NETWORK_ERROR")]
    Network,
    /// The provider did not answer in time
    #[display("TIMEOUT")]
    Timeout,
    /// The provider returned an error payload
    #[display("API_ERROR")]
    Api,
    /// The payload was malformed or empty
    #[display("INVALID_RESPONSE")]
    InvalidResponse,
    /// The provider (or its local quota) refused the call
    #[display("RATE_LIMITED")]
    RateLimited,
    /// The payload could not be parsed into the expected shape
    #[display("PARSE_ERROR")]
    Parse,
    /// The provider is switched off, unhealthy, or unreachable
    #[display("PROVIDER_UNAVAILABLE")]
    ProviderUnavailable,
}

/// Specific provider error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Connection refused, DNS failure, reset
    #[display("Network failure: {}", _0)]
    Network(String),
    /// Request exceeded its network-level timeout
    #[display("Request timed out after {}ms", _0)]
    Timeout(u64),
    /// Provider returned a non-success status
    #[display("HTTP {} error: {}", status, message)]
    Api {
        /// HTTP status code
        status: u16,
        /// Error body
        message: String,
    },
    /// Provider answered with an empty or structurally invalid payload
    #[display("Invalid response: {}", _0)]
    InvalidResponse(String),
    /// Provider throttled the call
    #[display("Rate limited by {}", _0)]
    RateLimited(String),
    /// Payload could not be decoded
    #[display("Failed to parse response: {}", _0)]
    Parse(String),
    /// Provider cannot take calls right now
    #[display("Provider unavailable: {}", _0)]
    ProviderUnavailable(String),
    /// The request itself is malformed; every provider would refuse it
    #[display("Invalid request: {}", _0)]
    InvalidRequest(String),
    /// Credentials were rejected
    #[display("Unauthorized: {}", _0)]
    Unauthorized(String),
}

impl ProviderErrorKind {
    /// Map this condition onto the recorded failure category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProviderErrorKind::Network(_) => ErrorCategory::Network,
            ProviderErrorKind::Timeout(_) => ErrorCategory::Timeout,
            ProviderErrorKind::Api { .. }
            | ProviderErrorKind::InvalidRequest(_)
            | ProviderErrorKind::Unauthorized(_) => ErrorCategory::Api,
            ProviderErrorKind::InvalidResponse(_) => ErrorCategory::InvalidResponse,
            ProviderErrorKind::RateLimited(_) => ErrorCategory::RateLimited,
            ProviderErrorKind::Parse(_) => ErrorCategory::Parse,
            ProviderErrorKind::ProviderUnavailable(_) => ErrorCategory::ProviderUnavailable,
        }
    }

    /// Check if this error should be retried.
    ///
    /// Malformed requests and rejected credentials fail the same way on every
    /// attempt; everything else is treated as transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderErrorKind::InvalidRequest(_) | ProviderErrorKind::Unauthorized(_) => false,
            ProviderErrorKind::Api { status, .. } => !matches!(*status, 400 | 401 | 403 | 404 | 422),
            _ => true,
        }
    }
}

/// Provider error with source location tracking.
///
/// # Examples
///
/// ```
/// use chronicler_error::{ErrorCategory, ProviderError, ProviderErrorKind, RetryableError};
///
/// let err = ProviderError::new(ProviderErrorKind::Api {
///     status: 503,
///     message: "overloaded".to_string(),
/// });
/// assert!(err.is_retryable());
/// assert_eq!(err.category(), ErrorCategory::Api);
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error: {} at line {} in {}", kind, line, file)]
pub struct ProviderError {
    /// The kind of error that occurred
    pub kind: ProviderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Failure category of the underlying kind.
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

/// Trait for errors that support retry logic.
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    ///
    /// Transient errors like 503, 429, or network timeouts return true.
    /// Permanent errors like 401 or 400 return false.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for ProviderError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_permanent() {
        for status in [400, 401, 403, 404, 422] {
            let kind = ProviderErrorKind::Api {
                status,
                message: String::new(),
            };
            assert!(!kind.is_retryable(), "status {} should not retry", status);
        }
    }

    #[test]
    fn server_errors_are_transient() {
        for status in [408, 429, 500, 502, 503, 504] {
            let kind = ProviderErrorKind::Api {
                status,
                message: String::new(),
            };
            assert!(kind.is_retryable(), "status {} should retry", status);
        }
        assert!(ProviderErrorKind::Timeout(500).is_retryable());
        assert!(ProviderErrorKind::Parse("eof".into()).is_retryable());
    }

    #[test]
    fn malformed_request_maps_to_api_category() {
        let kind = ProviderErrorKind::InvalidRequest("empty prompt".into());
        assert_eq!(kind.category(), ErrorCategory::Api);
        assert!(!kind.is_retryable());
    }
}
