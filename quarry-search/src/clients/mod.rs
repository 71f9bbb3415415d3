//! Narrow interfaces to the three search services, plus their native records.
//!
//! The engine only ever calls the methods below. Clients arrive already
//! authenticated; connection pooling and retries are theirs to own. Any
//! failure is reported as a [`ClientError`] tagged transient or permanent.
//!
//! Bundled implementations:
//!
//! - [`ElasticsearchClient`]: full-text index over HTTP
//! - [`GraphQlCatalogClient`]: catalog graph over HTTP
//!
//! Object listing is always supplied by the embedding application.

pub mod elasticsearch;
pub mod graphql;

pub use elasticsearch::ElasticsearchClient;
pub use graphql::GraphQlCatalogClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::types::{Scope, SearchFilters};

/// JSON object used for free-form backend metadata.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Query sent to the full-text index.
#[derive(Debug, Clone, PartialEq)]
pub struct FullTextQuery {
    /// Keywords; `None` matches everything.
    pub text: Option<String>,
    /// Search breadth.
    pub scope: Scope,
    /// Bucket, catalog, or package name depending on `scope`.
    pub target: Option<String>,
    /// Filters the index may apply natively.
    pub filters: SearchFilters,
    /// Upper bound on returned hits.
    pub limit: usize,
}

/// One page of full-text hits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FullTextPage {
    /// Hits in relevance order.
    pub hits: Vec<FullTextHit>,
    /// Total matches reported by the index, when it tracks them.
    pub total: Option<u64>,
}

/// A document from the full-text index: either an object or a package revision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FullTextHit {
    /// Bucket the document belongs to.
    pub bucket: String,
    /// Object key, for object documents.
    pub key: Option<String>,
    /// Package name, for package documents.
    pub package_name: Option<String>,
    /// Package top hash, for package documents.
    pub top_hash: Option<String>,
    /// Object size in bytes.
    pub size: Option<u64>,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Native relevance score.
    pub score: Option<f64>,
    /// Remaining document fields.
    pub metadata: Option<Metadata>,
}

/// Access to the full-text index.
#[async_trait]
pub trait FullTextClient: Send + Sync {
    /// Return up to `query.limit` hits.
    async fn query(&self, query: &FullTextQuery) -> Result<FullTextPage, ClientError>;

    /// Count matches server-side without materialising them.
    async fn count(&self, query: &FullTextQuery) -> Result<u64, ClientError>;
}

/// Filter object accepted by the catalog graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFilter {
    /// Keywords; `None` matches everything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Restrict to one catalog / registry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    /// Restrict to one package.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Extensions without the leading dot.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    /// Minimum size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    /// Maximum size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    /// Entries modified at or after this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_after: Option<DateTime<Utc>>,
    /// Entries modified before this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_before: Option<DateTime<Utc>>,
    /// Entries per page.
    pub first: usize,
}

/// One page of catalog entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogPage {
    /// Entries in catalog order.
    pub entries: Vec<CatalogEntry>,
    /// Cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
    /// Total matches, when the catalog reports it.
    pub total: Option<u64>,
}

/// An entry in the catalog graph.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Catalog-wide entry id.
    pub id: String,
    /// Display name (package name or logical key).
    #[serde(default)]
    pub name: String,
    /// Bucket, when the entry is tied to one.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Package top hash, for package entries.
    #[serde(default)]
    pub top_hash: Option<String>,
    /// Physical `s3://` location, for object entries.
    #[serde(default)]
    pub physical_key: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    /// Last modification time.
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    /// User metadata.
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Access to the catalog graph.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch one page of entries matching `filter`, starting after `cursor`.
    async fn search_entries(
        &self,
        filter: &CatalogFilter,
        cursor: Option<&str>,
    ) -> Result<CatalogPage, ClientError>;
}

/// One page of a raw object listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    /// Objects in storage order.
    pub objects: Vec<ListedObject>,
    /// Continuation token; `None` on the last page.
    pub next_token: Option<String>,
}

/// An object from the raw storage listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListedObject {
    /// Bucket holding the object.
    pub bucket: String,
    /// Object key, possibly percent-encoded.
    pub key: String,
    /// Size in bytes.
    pub size: Option<u64>,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Entity tag.
    pub etag: Option<String>,
}

/// Access to raw object storage listings.
#[async_trait]
pub trait ObjectListingClient: Send + Sync {
    /// List objects in `bucket` under `prefix`, continuing from `continuation`.
    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListingPage, ClientError>;
}
