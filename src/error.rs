//! Error types for the quarry host.
//!
//! Each variant carries a stable error code (SCREAMING_SNAKE_CASE) that is
//! included in the Display output and accessible via [`QuarryError::code()`].
//! Codes are part of the host protocol and will not change.

use quarry_search::SearchError;

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// Invalid or unreadable configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// Tool arguments failed validation.
    pub const TOOL_VALIDATION: &str = "TOOL_VALIDATION";

    /// Tool execution failed outside the search itself.
    pub const TOOL_FAILED: &str = "TOOL_FAILED";

    /// The search ran but produced no usable outcome.
    pub const SEARCH_FAILED: &str = "SEARCH_FAILED";

    /// Reading from or writing to the host channel failed.
    pub const HOST_IO: &str = "HOST_IO";
}

/// Errors produced by the quarry host.
///
/// The Display impl formats as `[CODE] message`.
#[derive(Debug, thiserror::Error)]
pub enum QuarryError {
    /// Invalid or unreadable configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    Config(String),

    /// Tool arguments failed validation.
    #[error("[{}] {}", error_codes::TOOL_VALIDATION, .0)]
    ToolValidation(String),

    /// Tool execution failed outside the search itself.
    #[error("[{}] {}", error_codes::TOOL_FAILED, .0)]
    ToolFailed(String),

    /// The search ran but produced no usable outcome.
    #[error("[{}] {}", error_codes::SEARCH_FAILED, .0)]
    SearchFailed(String),

    /// Reading from or writing to the host channel failed.
    #[error("[{}] {}", error_codes::HOST_IO, .0)]
    HostIo(String),
}

impl QuarryError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => error_codes::CONFIG_INVALID,
            Self::ToolValidation(_) => error_codes::TOOL_VALIDATION,
            Self::ToolFailed(_) => error_codes::TOOL_FAILED,
            Self::SearchFailed(_) => error_codes::SEARCH_FAILED,
            Self::HostIo(_) => error_codes::HOST_IO,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Config(m)
            | Self::ToolValidation(m)
            | Self::ToolFailed(m)
            | Self::SearchFailed(m)
            | Self::HostIo(m) => m,
        }
    }
}

impl From<SearchError> for QuarryError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Validation { .. } => Self::ToolValidation(err.to_string()),
            SearchError::Config(m) => Self::Config(m),
            other => Self::SearchFailed(other.to_string()),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, QuarryError>;
