//! Shared HTTP plumbing for the bundled backend clients.
//!
//! Provides a configured [`reqwest::Client`] and the mapping from HTTP
//! failures onto transient / permanent [`ClientError`]s.

use reqwest::StatusCode;

use crate::config::EngineConfig;
use crate::error::{ClientError, SearchError};

/// User-Agent used when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("quarry-search/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] for backend API calls.
///
/// The client has:
/// - Timeout equal to the per-backend budget (the engine enforces it too)
/// - Configured User-Agent, or [`DEFAULT_USER_AGENT`]
/// - gzip decompression
///
/// # Errors
///
/// Returns [`SearchError::Config`] if the client cannot be constructed.
pub fn build_client(config: &EngineConfig) -> Result<reqwest::Client, SearchError> {
    let ua = config
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());

    reqwest::Client::builder()
        .timeout(config.backend_timeout())
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| SearchError::Config(format!("failed to build HTTP client: {e}")))
}

/// Classify a non-success status.
///
/// Throttling and server errors are transient; everything else (bad target,
/// missing index, denied) is permanent.
pub fn status_error(service: &str, status: StatusCode) -> ClientError {
    let message = format!("{service} returned HTTP {}", status.as_u16());
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        ClientError::transient(message)
    } else {
        ClientError::permanent(message)
    }
}

/// Classify a transport-level failure.
pub fn transport_error(service: &str, err: &reqwest::Error) -> ClientError {
    if err.is_decode() {
        ClientError::permanent(format!("{service} sent an unreadable response"))
    } else if err.is_timeout() {
        ClientError::transient(format!("{service} request timed out"))
    } else {
        ClientError::transient(format!("{service} unreachable"))
    }
}
