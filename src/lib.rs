//! Quarry: unified data-catalog search host.
//!
//! Wraps the [`quarry_search`] engine for use by an assistant or any other
//! line-oriented client:
//!
//! - **Configuration**: a TOML file naming the full-text and catalog
//!   endpoints, engine budgets, and per-backend overrides
//! - **Engine construction**: registers the configured backends and builds
//!   the orchestrator
//! - **Tools**: `catalog_search` and `backend_status`, called with JSON
//!   arguments and answering with JSON
//! - **Host**: newline-delimited JSON over stdin/stdout

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod tools;

pub use config::QuarryConfig;
pub use engine::{Collaborators, build_orchestrator};
pub use error::{QuarryError, Result};

use std::sync::Arc;

use quarry_search::Orchestrator;

/// Registry holding every tool backed by `orchestrator`.
pub fn default_tools(orchestrator: Arc<Orchestrator>) -> tools::ToolRegistry {
    let mut registry = tools::ToolRegistry::new();
    registry.register(Arc::new(tools::CatalogSearchTool::new(Arc::clone(
        &orchestrator,
    ))));
    registry.register(Arc::new(tools::BackendStatusTool::new(orchestrator)));
    registry
}
