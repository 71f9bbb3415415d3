//! Engine configuration with sensible defaults.
//!
//! [`EngineConfig`] controls time budgets, pagination bounds, preview
//! behaviour and backend health tracking. Every field has a serde default
//! so a partial `[engine]` TOML table is enough.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Configuration for the search engine.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-backend time budget in milliseconds.
    pub backend_timeout_ms: u64,
    /// Overall request time budget in milliseconds. Bounds every backend.
    pub request_timeout_ms: u64,
    /// How many top items the explainer annotates.
    pub explain_top_n: usize,
    /// Maximum characters in a content preview.
    pub preview_max_chars: usize,
    /// Time budget for a single preview fetch in milliseconds.
    pub preview_timeout_ms: u64,
    /// How long fetched previews are cached. Set to 0 to disable caching.
    pub preview_cache_ttl_seconds: u64,
    /// Maximum catalog pages fetched per request.
    pub catalog_max_pages: usize,
    /// Maximum listing pages fetched per request.
    pub listing_max_pages: usize,
    /// Consecutive failures before a backend is flagged unhealthy.
    pub failure_threshold: u32,
    /// Seconds an unhealthy backend waits before it is probed as half-open.
    pub health_cooldown_secs: u64,
    /// User-Agent for the bundled HTTP clients. Defaults to `quarry-search/<version>`.
    pub user_agent: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend_timeout_ms: 3_000,
            request_timeout_ms: 8_000,
            explain_top_n: 5,
            preview_max_chars: 280,
            preview_timeout_ms: 1_500,
            preview_cache_ttl_seconds: 300,
            catalog_max_pages: 10,
            listing_max_pages: 20,
            failure_threshold: 3,
            health_cooldown_secs: 60,
            user_agent: None,
        }
    }
}

impl EngineConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `backend_timeout_ms` and `request_timeout_ms` must be greater than 0
    /// - `request_timeout_ms` must be >= `backend_timeout_ms`
    /// - page bounds must be greater than 0
    /// - `failure_threshold` must be greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.backend_timeout_ms == 0 {
            return Err(SearchError::Config(
                "backend_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(SearchError::Config(
                "request_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.request_timeout_ms < self.backend_timeout_ms {
            return Err(SearchError::Config(
                "request_timeout_ms must be >= backend_timeout_ms".into(),
            ));
        }
        if self.catalog_max_pages == 0 || self.listing_max_pages == 0 {
            return Err(SearchError::Config(
                "catalog_max_pages and listing_max_pages must be greater than 0".into(),
            ));
        }
        if self.failure_threshold == 0 {
            return Err(SearchError::Config(
                "failure_threshold must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Per-backend budget.
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    /// Overall request budget.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Budget for one preview fetch.
    pub fn preview_timeout(&self) -> Duration {
        Duration::from_millis(self.preview_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let config = EngineConfig::default();
        assert_eq!(config.backend_timeout_ms, 3_000);
        assert_eq!(config.request_timeout_ms, 8_000);
        assert_eq!(config.explain_top_n, 5);
        assert_eq!(config.failure_threshold, 3);
        assert!(config.user_agent.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_backend_timeout_rejected() {
        let config = EngineConfig {
            backend_timeout_ms: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backend_timeout_ms"));
    }

    #[test]
    fn request_timeout_shorter_than_backend_rejected() {
        let config = EngineConfig {
            backend_timeout_ms: 5_000,
            request_timeout_ms: 1_000,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("request_timeout_ms"));
    }

    #[test]
    fn zero_pages_rejected() {
        let config = EngineConfig {
            listing_max_pages: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_failure_threshold_rejected() {
        let config = EngineConfig {
            failure_threshold: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("failure_threshold"));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"backend_timeout_ms": 1000}"#).expect("parse");
        assert_eq!(config.backend_timeout_ms, 1_000);
        assert_eq!(config.request_timeout_ms, 8_000);
    }

    #[test]
    fn durations_follow_millis() {
        let config = EngineConfig::default();
        assert_eq!(config.backend_timeout(), Duration::from_secs(3));
        assert_eq!(config.request_timeout(), Duration::from_secs(8));
        assert_eq!(config.preview_timeout(), Duration::from_millis(1_500));
    }
}
