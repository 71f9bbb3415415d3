//! Error types for the quarry-search crate.
//!
//! Errors are layered: narrow backend clients return [`ClientError`],
//! adapters turn those into [`BackendError`] (contained to one backend's
//! status entry), and only [`SearchError`] ever reaches the caller.
//! All messages are stable strings; no credentials appear in them.

use crate::types::BackendId;

/// Top-level errors surfaced to the caller of a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The request violated the caller contract. Never retried or recovered.
    #[error("invalid request field `{field}`: {message}")]
    Validation {
        /// Name of the offending request field.
        field: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// No registered backend can serve the requested scope.
    #[error("no backend available for scope {0}")]
    NoBackends(String),

    /// Every selected backend ended in `error` or `timeout`.
    #[error("all search backends failed: {0}")]
    AllBackendsFailed(String),

    /// The caller cancelled the request before it completed.
    #[error("search cancelled")]
    Cancelled,

    /// Invalid engine configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl SearchError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Convenience type alias for quarry-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Failure of a single backend adapter. Always contained to that backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The backend did not answer within its budget.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Network-level or server-side failure that may succeed later.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Bad target, permission denied, malformed response.
    #[error("permanent failure: {0}")]
    Permanent(String),

    /// A count-only request reached a backend without server-side counting.
    #[error("count not supported by backend {0}")]
    CountUnsupported(BackendId),

    /// The adapter observed the cancellation signal and stopped.
    #[error("cancelled")]
    Cancelled,
}

impl BackendError {
    /// Whether this failure is transient (timeouts, network, cancellation).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Transient(_) | Self::Cancelled)
    }
}

/// How a backend client classifies its own failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// Network, timeout, throttling, 5xx.
    Transient,
    /// Bad target, permission, unparseable payload.
    Permanent,
}

/// Error returned by the narrow backend client interfaces.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ClientError {
    /// Transient or permanent.
    pub kind: ClientErrorKind,
    /// Description safe to show to users.
    pub message: String,
}

impl ClientError {
    /// A failure that may succeed if retried later.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ClientErrorKind::Transient,
            message: message.into(),
        }
    }

    /// A failure that will not succeed without changing the request.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ClientErrorKind::Permanent,
            message: message.into(),
        }
    }
}

impl From<ClientError> for BackendError {
    fn from(err: ClientError) -> Self {
        match err.kind {
            ClientErrorKind::Transient => Self::Transient(err.message),
            ClientErrorKind::Permanent => Self::Permanent(err.message),
        }
    }
}

/// A raw hit that could not be normalised into a result item.
///
/// Only the offending hit is dropped; the error is logged, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot normalise hit from {backend}: {reason}")]
pub struct AggregationError {
    /// Backend that produced the hit.
    pub backend: BackendId,
    /// What was missing or malformed.
    pub reason: String,
}
