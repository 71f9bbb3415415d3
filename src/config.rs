//! Host configuration loaded from TOML.
//!
//! ```toml
//! [engine]
//! backend_timeout_ms = 2500
//!
//! [fulltext]
//! url = "https://search.example.com"
//! index_pattern = "*,-*_packages"
//!
//! [catalog]
//! url = "https://catalog.example.com/graphql"
//!
//! [[backends]]
//! id = "listing"
//! scopes = ["bucket"]
//! down = false
//! ```
//!
//! The file is read from `QUARRY_CONFIG` when set, otherwise from
//! `<config dir>/quarry/config.toml`. A missing file yields defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use quarry_search::{BackendId, EngineConfig, Scope};

use crate::error::{QuarryError, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "QUARRY_CONFIG";

/// Default full-text index pattern for global and catalog scope.
pub const DEFAULT_INDEX_PATTERN: &str = "*";

/// Top-level host configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarryConfig {
    /// Engine budgets and limits.
    pub engine: EngineConfig,
    /// Full-text index endpoint. The backend is not registered when absent.
    pub fulltext: Option<FullTextSection>,
    /// GraphQL catalog endpoint. The backend is not registered when absent.
    pub catalog: Option<CatalogSection>,
    /// Per-backend scope and availability overrides.
    pub backends: Vec<BackendOverride>,
}

/// `[fulltext]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullTextSection {
    /// Cluster base URL.
    pub url: String,
    /// Index pattern searched outside bucket scope.
    #[serde(default = "default_index_pattern")]
    pub index_pattern: String,
}

/// `[catalog]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSection {
    /// GraphQL endpoint URL.
    pub url: String,
}

/// One `[[backends]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendOverride {
    /// Backend id (`fulltext`, `catalog`, `listing`).
    pub id: String,
    /// Scopes served, replacing the backend's defaults.
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    /// Start the backend marked down.
    #[serde(default)]
    pub down: bool,
}

fn default_index_pattern() -> String {
    DEFAULT_INDEX_PATTERN.to_owned()
}

/// A validated override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOverride {
    /// Backend the override applies to.
    pub id: BackendId,
    /// Replacement scope set, if any.
    pub scopes: Option<Vec<Scope>>,
    /// Start marked down.
    pub down: bool,
}

impl QuarryConfig {
    /// Check engine limits and resolve backend overrides.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Config`] naming the offending entry.
    pub fn validate(&self) -> Result<Vec<ResolvedOverride>> {
        self.engine
            .validate()
            .map_err(|e| QuarryError::Config(e.to_string()))?;
        if let Some(fulltext) = &self.fulltext {
            if fulltext.url.trim().is_empty() {
                return Err(QuarryError::Config("fulltext.url must not be empty".into()));
            }
        }
        if let Some(catalog) = &self.catalog {
            if catalog.url.trim().is_empty() {
                return Err(QuarryError::Config("catalog.url must not be empty".into()));
            }
        }
        self.backends.iter().map(resolve_override).collect()
    }
}

fn resolve_override(raw: &BackendOverride) -> Result<ResolvedOverride> {
    let id = BackendId::parse(&raw.id)
        .ok_or_else(|| QuarryError::Config(format!("unknown backend id '{}'", raw.id)))?;
    let scopes = raw
        .scopes
        .as_ref()
        .map(|names| {
            names
                .iter()
                .map(|name| {
                    name.parse::<Scope>()
                        .map_err(|e| QuarryError::Config(format!("backends.{id}.scopes: {e}")))
                })
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?;
    Ok(ResolvedOverride {
        id,
        scopes,
        down: raw.down,
    })
}

/// Resolve the config file path from an explicit override, falling back to
/// the platform config directory.
pub fn config_path_from(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    dirs::config_dir()
        .map(|d| d.join("quarry"))
        .unwrap_or_else(|| PathBuf::from("/tmp/quarry-config"))
        .join("config.toml")
}

/// Config file path honouring [`CONFIG_ENV`].
#[must_use]
pub fn config_path() -> PathBuf {
    config_path_from(std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

/// Read and parse a config file.
///
/// # Errors
///
/// Returns [`QuarryError::Config`] if the file cannot be read or parsed.
pub fn read_config(path: &Path) -> Result<QuarryConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        QuarryError::Config(format!(
            "failed to read config file '{}': {e}",
            path.display()
        ))
    })?;
    toml::from_str(&contents).map_err(|e| {
        QuarryError::Config(format!(
            "failed to parse config file '{}': {e}",
            path.display()
        ))
    })
}

/// Load configuration from `path`, using defaults when the file is absent.
///
/// # Errors
///
/// Returns [`QuarryError::Config`] if an existing file cannot be read or parsed.
pub fn load_from(path: &Path) -> Result<QuarryConfig> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no config file; using defaults");
        return Ok(QuarryConfig::default());
    }
    let config = read_config(path)?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Load configuration from [`config_path()`].
///
/// # Errors
///
/// Same as [`load_from`].
pub fn load() -> Result<QuarryConfig> {
    load_from(&config_path())
}
