//! Core request, response, and backend identification types.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::clients::{CatalogEntry, FullTextHit, ListedObject};
use crate::explain::Explanation;

/// Default number of items returned when a request does not set `limit`.
pub const DEFAULT_LIMIT: i64 = 50;

/// Breadth of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Every catalog and bucket the caller can see.
    Global,
    /// One named catalog / registry.
    Catalog,
    /// One named data package.
    Package,
    /// One named storage bucket.
    Bucket,
}

impl Scope {
    /// Lowercase wire name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Catalog => "catalog",
            Self::Package => "package",
            Self::Bucket => "bucket",
        }
    }

    /// Returns all scope variants.
    pub fn all() -> &'static [Scope] {
        &[Self::Global, Self::Catalog, Self::Package, Self::Bucket]
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "catalog" => Ok(Self::Catalog),
            "package" => Ok(Self::Package),
            "bucket" => Ok(Self::Bucket),
            other => Err(format!("unknown scope '{other}'")),
        }
    }
}

/// The closed set of search backends.
///
/// Declaration order is the priority order: richer-metadata backends come
/// first and win ranking ties and metadata conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    /// Full-text document index; the only backend with server-side counts.
    FullText,
    /// GraphQL catalog API.
    Catalog,
    /// Raw object listing; no native filtering, never serves catalog scope.
    Listing,
}

impl BackendId {
    /// Wire identifier.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FullText => "fulltext",
            Self::Catalog => "catalog",
            Self::Listing => "listing",
        }
    }

    /// Position in the fixed priority order (0 is highest).
    pub fn priority(&self) -> usize {
        match self {
            Self::FullText => 0,
            Self::Catalog => 1,
            Self::Listing => 2,
        }
    }

    /// Weight used for the informational per-item score.
    pub fn weight(&self) -> f64 {
        match self {
            Self::FullText => 1.2,
            Self::Catalog => 1.0,
            Self::Listing => 0.6,
        }
    }

    /// Whether the backend can count matches without materialising them.
    pub fn supports_count(&self) -> bool {
        matches!(self, Self::FullText)
    }

    /// Returns all backends in priority order.
    pub fn all() -> &'static [BackendId] {
        &[Self::FullText, Self::Catalog, Self::Listing]
    }

    /// Parse a wire identifier; `None` for unknown ids.
    pub fn parse(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "fulltext" | "full-text" | "elasticsearch" => Some(Self::FullText),
            "catalog" | "graphql" => Some(Self::Catalog),
            "listing" | "s3" => Some(Self::Listing),
            _ => None,
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Filters that narrow a search. Explicit request filters always win over
/// filters inferred from the query text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    /// Lowercase file extensions without the leading dot (`csv`, `tar.gz`).
    #[serde(
        alias = "extension",
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub extensions: Vec<String>,
    /// Minimum object size in bytes (inclusive).
    #[serde(alias = "min_size", skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    /// Maximum object size in bytes (inclusive).
    #[serde(alias = "max_size", skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    /// Only items modified at or after this instant.
    #[serde(alias = "modified_after", skip_serializing_if = "Option::is_none")]
    pub modified_after: Option<DateTime<Utc>>,
    /// Only items modified strictly before this instant.
    #[serde(alias = "modified_before", skip_serializing_if = "Option::is_none")]
    pub modified_before: Option<DateTime<Utc>>,
    /// Number of ranked items to skip before truncating to `limit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl SearchFilters {
    /// True when no narrowing filter is set (`offset` does not narrow).
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
            && self.min_size.is_none()
            && self.max_size.is_none()
            && self.modified_after.is_none()
            && self.modified_before.is_none()
    }

    /// Field-wise merge where every field set on `self` wins over `inferred`.
    pub fn merged_over(&self, inferred: &SearchFilters) -> SearchFilters {
        SearchFilters {
            extensions: if self.extensions.is_empty() {
                inferred.extensions.clone()
            } else {
                normalize_extensions(&self.extensions)
            },
            min_size: self.min_size.or(inferred.min_size),
            max_size: self.max_size.or(inferred.max_size),
            modified_after: self.modified_after.or(inferred.modified_after),
            modified_before: self.modified_before.or(inferred.modified_before),
            offset: self.offset.or(inferred.offset),
        }
    }
}

/// Lowercase, strip leading `*` / `.`, drop empties and duplicates.
pub(crate) fn normalize_extensions(exts: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(exts.len());
    for ext in exts {
        let clean = ext
            .trim()
            .trim_start_matches('*')
            .trim_start_matches('.')
            .to_ascii_lowercase();
        if !clean.is_empty() && !out.contains(&clean) {
            out.push(clean);
        }
    }
    out
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => s.split(',').map(str::to_owned).collect(),
        Some(OneOrMany::Many(v)) => v,
    })
}

/// One search call, as received from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    /// Free-text or structured query.
    pub query: String,
    /// Breadth of the search.
    pub scope: Scope,
    /// Catalog / package / bucket identifier. Required unless scope is global.
    pub target: Option<String>,
    /// Explicit backend ids; empty means auto-select.
    pub backends: Vec<String>,
    /// Maximum number of items returned. Must be >= 0.
    pub limit: i64,
    /// Keep backend metadata on items.
    pub include_metadata: bool,
    /// Attach a short best-effort content excerpt to each item.
    pub include_content_preview: bool,
    /// Attach an [`Explanation`] to the response.
    pub explain: bool,
    /// Explicit filters.
    pub filters: SearchFilters,
    /// Only count matches (full-text backend only).
    pub count_only: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            scope: Scope::Global,
            target: None,
            backends: Vec::new(),
            limit: DEFAULT_LIMIT,
            include_metadata: false,
            include_content_preview: false,
            explain: false,
            filters: SearchFilters::default(),
            count_only: false,
        }
    }
}

impl SearchRequest {
    /// Shorthand for a global keyword search.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Target with surrounding whitespace removed, `None` when blank.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// How the query text was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    /// Plain keyword search.
    Keyword,
    /// Only a match count is wanted.
    Count,
    /// Driven mainly by extension / size / date filters.
    Structured,
}

/// Derived, immutable view of a request's query. Owned by one orchestration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuery {
    /// The query exactly as received.
    pub raw_query: String,
    /// Lowercased search terms in query order.
    pub keywords: Vec<String>,
    /// Extensions recognised in the query text.
    pub inferred_extensions: BTreeSet<String>,
    /// Filters recognised in the query text alone.
    pub inferred_filters: SearchFilters,
    /// Effective filters: explicit request filters merged over inferred ones.
    pub filters: SearchFilters,
    /// Query classification.
    pub intent: QueryIntent,
}

impl ParsedQuery {
    /// Keywords joined for backends that take a text query; `None` means match-all.
    pub fn text(&self) -> Option<String> {
        let joined = self.keywords.join(" ");
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    }
}

/// A backend-native record, tagged with its backend of origin.
#[derive(Debug, Clone, PartialEq)]
pub enum RawHit {
    /// Document from the full-text index.
    FullText(FullTextHit),
    /// Entry from the catalog graph.
    Catalog(CatalogEntry),
    /// Object from the raw listing.
    Listing(ListedObject),
}

impl RawHit {
    /// Backend that produced this hit.
    pub fn backend(&self) -> BackendId {
        match self {
            Self::FullText(_) => BackendId::FullText,
            Self::Catalog(_) => BackendId::Catalog,
            Self::Listing(_) => BackendId::Listing,
        }
    }
}

/// What kind of thing a result item points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A stored object (bucket + key).
    Object,
    /// A data package revision (name + top hash).
    Package,
    /// A catalog entry with no physical location.
    Entry,
}

/// Normalised output unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    /// Deduplication key.
    pub identity: String,
    /// Object, package, or bare catalog entry.
    pub kind: ItemKind,
    /// Human-readable location.
    pub display_path: String,
    /// Bucket holding the item, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// Size in bytes, when known.
    pub size_bytes: Option<u64>,
    /// Last modification time, when known.
    pub last_modified: Option<DateTime<Utc>>,
    /// Backends that independently found this item, in priority order.
    pub source_backends: BTreeSet<BackendId>,
    /// Informational relevance score (higher is better).
    pub score: f64,
    /// Backend metadata, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    /// Best-effort content excerpt, when requested and available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_preview: Option<String>,
}

/// Outcome of one backend within one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    /// Returned results (possibly none).
    Ok,
    /// Exceeded its own or the overall time budget.
    Timeout,
    /// Failed; see `errorMessage`.
    Error,
    /// Not invoked.
    Skipped,
}

/// Per-backend diagnostics attached to every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendReport {
    /// Backend id as requested (unknown ids are echoed verbatim).
    pub id: String,
    /// Final status.
    pub status: BackendStatus,
    /// Wall time spent on this backend.
    pub latency_ms: u64,
    /// Raw hits the backend returned.
    pub hit_count: usize,
    /// Why the backend failed or was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl BackendReport {
    /// A backend that was never invoked.
    pub fn skipped(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: BackendStatus::Skipped,
            latency_ms: 0,
            hit_count: 0,
            error_message: Some(reason.into()),
        }
    }

    /// A backend that ended in an error without producing hits.
    pub fn error(id: impl Into<String>, latency_ms: u64, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: BackendStatus::Error,
            latency_ms,
            hit_count: 0,
            error_message: Some(message.into()),
        }
    }

    /// Whether the backend was invoked and failed.
    pub fn is_failure(&self) -> bool {
        matches!(self.status, BackendStatus::Error | BackendStatus::Timeout)
    }
}

/// The engine's answer to one [`SearchRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResponse {
    /// Ranked, deduplicated, truncated items.
    pub items: Vec<ResultItem>,
    /// Match count from a backend that can count, when available.
    pub total_matched_estimate: Option<u64>,
    /// One entry per requested or selected backend.
    pub backends_queried: Vec<BackendReport>,
    /// Present only when the request asked for it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_priority_matches_ordering() {
        let mut ids = vec![BackendId::Listing, BackendId::FullText, BackendId::Catalog];
        ids.sort();
        assert_eq!(ids, BackendId::all());
        for (i, id) in BackendId::all().iter().enumerate() {
            assert_eq!(id.priority(), i);
        }
    }

    #[test]
    fn only_fulltext_counts() {
        assert!(BackendId::FullText.supports_count());
        assert!(!BackendId::Catalog.supports_count());
        assert!(!BackendId::Listing.supports_count());
    }

    #[test]
    fn backend_id_parse_accepts_aliases() {
        assert_eq!(BackendId::parse("FullText"), Some(BackendId::FullText));
        assert_eq!(BackendId::parse("elasticsearch"), Some(BackendId::FullText));
        assert_eq!(BackendId::parse("graphql"), Some(BackendId::Catalog));
        assert_eq!(BackendId::parse(" s3 "), Some(BackendId::Listing));
        assert_eq!(BackendId::parse("solr"), None);
    }

    #[test]
    fn scope_from_str_is_case_insensitive() {
        assert_eq!("Bucket".parse::<Scope>(), Ok(Scope::Bucket));
        assert!("planet".parse::<Scope>().is_err());
    }

    #[test]
    fn request_defaults() {
        let request: SearchRequest = serde_json::from_str(r#"{"query":"cells"}"#).expect("parse");
        assert_eq!(request.limit, DEFAULT_LIMIT);
        assert_eq!(request.scope, Scope::Global);
        assert!(request.backends.is_empty());
        assert!(!request.count_only);
    }

    #[test]
    fn filters_accept_single_extension_string() {
        let filters: SearchFilters =
            serde_json::from_str(r#"{"extension":"csv,tsv","minSize":10}"#).expect("parse");
        assert_eq!(filters.extensions, vec!["csv", "tsv"]);
        assert_eq!(filters.min_size, Some(10));
    }

    #[test]
    fn explicit_filters_win_over_inferred() {
        let explicit = SearchFilters {
            extensions: vec![".PARQUET".into()],
            max_size: Some(5),
            ..Default::default()
        };
        let inferred = SearchFilters {
            extensions: vec!["csv".into()],
            min_size: Some(1),
            max_size: Some(100),
            ..Default::default()
        };
        let merged = explicit.merged_over(&inferred);
        assert_eq!(merged.extensions, vec!["parquet"]);
        assert_eq!(merged.min_size, Some(1));
        assert_eq!(merged.max_size, Some(5));
    }

    #[test]
    fn parsed_query_text_is_none_for_blank_keywords() {
        let parsed = ParsedQuery {
            raw_query: "  ".into(),
            keywords: vec!["  ".into()],
            inferred_extensions: BTreeSet::new(),
            inferred_filters: SearchFilters::default(),
            filters: SearchFilters::default(),
            intent: QueryIntent::Keyword,
        };
        assert_eq!(parsed.text(), None);
    }

    #[test]
    fn response_serialises_camel_case() {
        let response = AggregatedResponse {
            items: vec![],
            total_matched_estimate: Some(3),
            backends_queried: vec![BackendReport::skipped("solr", "unknown backend")],
            explanation: None,
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["totalMatchedEstimate"], 3);
        assert_eq!(json["backendsQueried"][0]["status"], "skipped");
        assert_eq!(json["backendsQueried"][0]["errorMessage"], "unknown backend");
        assert!(json.get("explanation").is_none());
    }
}
