//! # quarry-search
//!
//! Unified search over a data catalog's three backends.
//!
//! One request is parsed once, fanned out concurrently to every backend that
//! can serve its scope, and the surviving hits are merged into a single
//! deduplicated, filtered and ranked list.
//!
//! ## Backends
//!
//! - full-text document index (Elasticsearch-compatible), the only backend
//!   that can count matches server-side
//! - catalog graph queried over GraphQL
//! - object listing, a bucket-scoped fallback that matches keys locally
//!
//! ## Failure model
//!
//! A slow or failing backend never fails the request on its own. Each
//! backend runs under its own timeout and the whole request under an overall
//! deadline; the outcome of every backend is reported in
//! [`AggregatedResponse::backends_queried`]. The request fails only when
//! every selected backend failed.
//!
//! ## Security
//!
//! - Query text is logged only at trace level
//! - Error messages never include credentials or full request bodies

pub mod backend;
pub mod backends;
pub mod clients;
pub mod config;
pub mod error;
pub mod explain;
pub mod health;
pub mod http;
pub mod orchestrator;
pub mod preview;
pub mod query;
pub mod registry;
pub mod types;

pub use backend::{Backend, BackendCall, BackendOutput, SearchBackend};
pub use config::EngineConfig;
pub use error::{BackendError, ClientError, Result, SearchError};
pub use explain::Explanation;
pub use orchestrator::Orchestrator;
pub use preview::PreviewSource;
pub use registry::BackendRegistry;
pub use types::{
    AggregatedResponse, BackendId, BackendReport, BackendStatus, ItemKind, ResultItem, Scope,
    SearchFilters, SearchRequest,
};
