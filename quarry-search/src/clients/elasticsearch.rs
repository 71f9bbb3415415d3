//! Full-text index client speaking the Elasticsearch `_search` / `_count` API.
//!
//! Each bucket has two indices: `<bucket>` for objects and
//! `<bucket>_packages` for package revisions. Object documents carry `key`,
//! `size`, `last_modified` and `ext`; package documents carry `handle`
//! (the package name) and `hash` (the top hash).
//!
//! One client is bound to one catalog's cluster. A catalog-scope search
//! therefore covers the whole `index_pattern`; its target names the catalog
//! the client already serves and adds no filter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{FullTextClient, FullTextHit, FullTextPage, FullTextQuery, Metadata};
use crate::config::EngineConfig;
use crate::error::{ClientError, SearchError};
use crate::http::{build_client, status_error, transport_error};
use crate::types::Scope;

const SERVICE: &str = "full-text index";
const PACKAGE_INDEX_SUFFIX: &str = "_packages";
const TEXT_FIELDS: &[&str] = &["key", "handle", "comment", "content", "metadata"];

/// [`FullTextClient`] over HTTP.
#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    http: reqwest::Client,
    base_url: String,
    index_pattern: String,
}

impl ElasticsearchClient {
    /// Create a client for the cluster at `base_url`.
    ///
    /// `index_pattern` is searched for global, catalog and package scope (e.g. `*`).
    pub fn new(
        base_url: &str,
        index_pattern: impl Into<String>,
        config: &EngineConfig,
    ) -> Result<Self, SearchError> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| SearchError::Config(format!("invalid full-text url: {e}")))?;
        Ok(Self {
            http: build_client(config)?,
            base_url: parsed.as_str().trim_end_matches('/').to_owned(),
            index_pattern: index_pattern.into(),
        })
    }

    fn indices(&self, query: &FullTextQuery) -> String {
        match (query.scope, query.target.as_deref()) {
            (Scope::Bucket, Some(target)) => {
                let bucket = target.split('/').next().unwrap_or(target);
                format!("{bucket},{bucket}{PACKAGE_INDEX_SUFFIX}")
            }
            _ => self.index_pattern.clone(),
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(SERVICE, status));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| transport_error(SERVICE, &e))
    }
}

#[async_trait]
impl FullTextClient for ElasticsearchClient {
    async fn query(&self, query: &FullTextQuery) -> Result<FullTextPage, ClientError> {
        let mut body = json!({
            "size": query.limit,
            "track_total_hits": true,
            "query": query_dsl(query),
        });
        if query.text.is_none() {
            body["sort"] = json!([
                { "last_modified": { "order": "desc", "unmapped_type": "date" } }
            ]);
        }
        tracing::trace!(indices = %self.indices(query), "full-text query");
        let value = self
            .post(&format!("{}/_search", self.indices(query)), &body)
            .await?;
        parse_search_response(value)
    }

    async fn count(&self, query: &FullTextQuery) -> Result<u64, ClientError> {
        let body = json!({ "query": query_dsl(query) });
        let value = self
            .post(&format!("{}/_count", self.indices(query)), &body)
            .await?;
        value
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| ClientError::permanent("full-text count response has no count"))
    }
}

/// Build the bool query shared by `_search` and `_count`.
fn query_dsl(query: &FullTextQuery) -> Value {
    let must = match query.text.as_deref() {
        Some(text) => json!([{
            "simple_query_string": {
                "query": text,
                "fields": TEXT_FIELDS,
                "default_operator": "and",
            }
        }]),
        None => json!([{ "match_all": {} }]),
    };

    let mut filter: Vec<Value> = Vec::new();
    let f = &query.filters;
    if !f.extensions.is_empty() {
        let exts: Vec<String> = f.extensions.iter().map(|e| format!(".{e}")).collect();
        filter.push(json!({ "terms": { "ext": exts } }));
    }
    if f.min_size.is_some() || f.max_size.is_some() {
        let mut range = serde_json::Map::new();
        if let Some(min) = f.min_size {
            range.insert("gte".into(), json!(min));
        }
        if let Some(max) = f.max_size {
            range.insert("lte".into(), json!(max));
        }
        filter.push(json!({ "range": { "size": range } }));
    }
    if f.modified_after.is_some() || f.modified_before.is_some() {
        let mut range = serde_json::Map::new();
        if let Some(after) = f.modified_after {
            range.insert("gte".into(), json!(after.to_rfc3339()));
        }
        if let Some(before) = f.modified_before {
            range.insert("lt".into(), json!(before.to_rfc3339()));
        }
        filter.push(json!({ "range": { "last_modified": range } }));
    }
    if let (Scope::Package, Some(name)) = (query.scope, query.target.as_deref()) {
        filter.push(json!({ "term": { "handle": name } }));
    }
    if let (Scope::Bucket, Some(target)) = (query.scope, query.target.as_deref()) {
        if let Some((_, prefix)) = target.split_once('/') {
            if !prefix.is_empty() {
                filter.push(json!({ "prefix": { "key": prefix } }));
            }
        }
    }

    json!({ "bool": { "must": must, "filter": filter } })
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    total: Option<Total>,
    #[serde(default)]
    hits: Vec<RawDocument>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Total {
    Tracked { value: u64 },
    Legacy(u64),
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Metadata,
}

fn parse_search_response(value: Value) -> Result<FullTextPage, ClientError> {
    let response: SearchResponse = serde_json::from_value(value)
        .map_err(|e| ClientError::permanent(format!("malformed full-text response: {e}")))?;

    let total = response.hits.total.map(|t| match t {
        Total::Tracked { value } => value,
        Total::Legacy(value) => value,
    });
    let hits = response.hits.hits.into_iter().map(into_hit).collect();
    Ok(FullTextPage { hits, total })
}

fn into_hit(doc: RawDocument) -> FullTextHit {
    let mut source = doc.source;
    let is_package = doc.index.ends_with(PACKAGE_INDEX_SUFFIX);
    let bucket = doc
        .index
        .strip_suffix(PACKAGE_INDEX_SUFFIX)
        .unwrap_or(&doc.index)
        .to_owned();

    let take_str = |source: &mut Metadata, field: &str| match source.remove(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    };

    let (key, package_name, top_hash) = if is_package {
        (
            None,
            take_str(&mut source, "handle"),
            take_str(&mut source, "hash"),
        )
    } else {
        (take_str(&mut source, "key"), None, None)
    };
    let size = source.remove("size").and_then(|v| v.as_u64());
    let last_modified = take_str(&mut source, "last_modified")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc));

    FullTextHit {
        bucket,
        key,
        package_name,
        top_hash,
        size,
        last_modified,
        score: doc.score,
        metadata: if source.is_empty() { None } else { Some(source) },
    }
}
