//! Error types for the ADL client.

use std::fmt;
use thiserror::Error;

/// Result type for ADL operations.
pub type AdlResult<T> = Result<T, AdlError>;

/// Why the store rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorCode {
    /// A read projection was malformed (for example an empty name).
    InvalidProjection,
    /// A staged operation was malformed.
    InvalidOperation,
    /// The request exceeded a store limit.
    TooLarge,
    /// The store's response did not match the request.
    MalformedResponse,
    /// Any other store-side failure.
    Internal,
}

impl fmt::Display for RemoteErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemoteErrorCode::InvalidProjection => "invalid projection",
            RemoteErrorCode::InvalidOperation => "invalid operation",
            RemoteErrorCode::TooLarge => "request too large",
            RemoteErrorCode::MalformedResponse => "malformed response",
            RemoteErrorCode::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// Errors returned by reads and commits.
///
/// Nothing is retried inside the client. Every failure reaches the caller.
#[derive(Debug, Error)]
pub enum AdlError {
    /// Transport or connection failure.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store rejected the request.
    #[error("remote error ({code}): {message}")]
    Remote {
        code: RemoteErrorCode,
        message: String,
    },

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// The round trip exceeded the configured timeout.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Invalid wire framing.
    #[error("frame error: {0}")]
    Frame(String),

    /// The commit holds more operations than the client allows in one
    /// request. Raised before anything is sent.
    #[error("commit of {count} operations exceeds the client limit of {limit}")]
    TooManyOperations { count: usize, limit: usize },

    /// A counter's staged net delta does not fit in an `i64`. Raised before
    /// anything is sent.
    #[error("staged delta for counter {0:?} is out of range")]
    CounterOverflow(String),
}

impl AdlError {
    /// Builds a [`AdlError::Remote`].
    pub fn remote(code: RemoteErrorCode, message: impl Into<String>) -> Self {
        Self::Remote {
            code,
            message: message.into(),
        }
    }

    /// Whether repeating the same `read` may succeed.
    #[must_use]
    pub fn is_retryable_read(&self) -> bool {
        matches!(self, AdlError::StoreUnavailable(_) | AdlError::Timeout(_))
    }

    /// Whether repeating the same commit is known not to double-apply.
    ///
    /// Always false: a transport failure may arrive after the store applied
    /// the commit, and counter deltas are not idempotent.
    #[must_use]
    pub fn is_safe_to_retry_commit(&self) -> bool {
        false
    }

    /// Returns the remote error code, if this is a store rejection.
    #[must_use]
    pub fn remote_code(&self) -> Option<RemoteErrorCode> {
        match self {
            AdlError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}
