//! The adapter interface every search backend implements.
//!
//! An adapter translates a [`BackendCall`] into its client's native query,
//! pages as needed, and returns raw hits (or a count). It never raises past
//! its own boundary: every failure comes back as a [`BackendError`].
//!
//! The backend set is closed, so dispatch goes through the [`Backend`] enum
//! rather than trait objects.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::backends::{CatalogBackend, FullTextBackend, ListingBackend};
use crate::error::{BackendError, ClientError};
use crate::types::{BackendId, ParsedQuery, RawHit, Scope, SearchFilters};

/// Everything an adapter needs for one invocation.
#[derive(Debug, Clone)]
pub struct BackendCall {
    /// Shared parse of the request query.
    pub parsed: Arc<ParsedQuery>,
    /// Search breadth.
    pub scope: Scope,
    /// Trimmed target, when the scope needs one.
    pub target: Option<String>,
    /// Raw hits wanted from this backend (request limit plus offset).
    pub limit: usize,
    /// Count matches instead of returning them.
    pub count_only: bool,
}

impl BackendCall {
    /// Effective filters (explicit over inferred).
    pub fn filters(&self) -> &SearchFilters {
        &self.parsed.filters
    }
}

/// What an adapter produced.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOutput {
    /// Native hits in backend order, plus the backend's total if it knows one.
    Hits {
        /// Raw hits, at most `limit`.
        hits: Vec<RawHit>,
        /// Server-side match total.
        total: Option<u64>,
    },
    /// Result of a count-only call.
    Count(u64),
}

impl BackendOutput {
    /// Number of raw hits carried.
    pub fn hit_count(&self) -> usize {
        match self {
            Self::Hits { hits, .. } => hits.len(),
            Self::Count(_) => 0,
        }
    }
}

/// A pluggable search backend adapter.
///
/// Implementors must observe `cancel` between pages and abandon in-flight
/// client calls when it fires.
pub trait SearchBackend: Send + Sync {
    /// Run one search (or count) against this backend.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] for client failures, unsupported counts,
    /// or cancellation.
    fn execute(
        &self,
        call: &BackendCall,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<BackendOutput, BackendError>> + Send;

    /// Which backend this adapter represents.
    fn id(&self) -> BackendId;
}

/// Closed set of adapters, dispatched without dynamic trait objects.
pub enum Backend {
    /// Full-text index adapter.
    FullText(FullTextBackend),
    /// GraphQL catalog adapter.
    Catalog(CatalogBackend),
    /// Object listing fallback adapter.
    Listing(ListingBackend),
}

impl Backend {
    /// Run one search against the wrapped adapter.
    pub async fn execute(
        &self,
        call: &BackendCall,
        cancel: &CancellationToken,
    ) -> Result<BackendOutput, BackendError> {
        match self {
            Self::FullText(b) => b.execute(call, cancel).await,
            Self::Catalog(b) => b.execute(call, cancel).await,
            Self::Listing(b) => b.execute(call, cancel).await,
        }
    }

    /// Which backend is wrapped.
    pub fn id(&self) -> BackendId {
        match self {
            Self::FullText(b) => b.id(),
            Self::Catalog(b) => b.id(),
            Self::Listing(b) => b.id(),
        }
    }

    /// Scopes this backend serves unless registered otherwise.
    pub fn default_scopes(&self) -> &'static [Scope] {
        match self {
            Self::FullText(_) => Scope::all(),
            Self::Catalog(_) => &[Scope::Global, Scope::Catalog, Scope::Package],
            Self::Listing(_) => &[Scope::Bucket],
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Backend").field(&self.id()).finish()
    }
}

/// Await a client call unless `cancel` fires first.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    call: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, BackendError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BackendError::Cancelled),
        result = call => result.map_err(BackendError::from),
    }
}
