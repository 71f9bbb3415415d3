//! Catalog client for the `searchEntries` GraphQL query.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{CatalogClient, CatalogEntry, CatalogFilter, CatalogPage};
use crate::config::EngineConfig;
use crate::error::{ClientError, SearchError};
use crate::http::{build_client, status_error, transport_error};

const SERVICE: &str = "catalog";

const SEARCH_ENTRIES: &str = "query SearchEntries($filter: EntryFilter!, $after: String) {
  searchEntries(filter: $filter, after: $after) {
    total
    nextCursor
    entries { id name bucket topHash physicalKey size modified metadata }
  }
}";

/// [`CatalogClient`] over HTTP.
#[derive(Debug, Clone)]
pub struct GraphQlCatalogClient {
    http: reqwest::Client,
    endpoint: url::Url,
}

impl GraphQlCatalogClient {
    /// Create a client posting to the GraphQL `endpoint`.
    pub fn new(endpoint: &str, config: &EngineConfig) -> Result<Self, SearchError> {
        let endpoint = url::Url::parse(endpoint)
            .map_err(|e| SearchError::Config(format!("invalid catalog url: {e}")))?;
        Ok(Self {
            http: build_client(config)?,
            endpoint,
        })
    }
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Data>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Data {
    search_entries: Option<SearchEntries>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchEntries {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    next_cursor: Option<String>,
    #[serde(default)]
    entries: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[async_trait]
impl CatalogClient for GraphQlCatalogClient {
    async fn search_entries(
        &self,
        filter: &CatalogFilter,
        cursor: Option<&str>,
    ) -> Result<CatalogPage, ClientError> {
        let body = json!({
            "query": SEARCH_ENTRIES,
            "variables": { "filter": filter, "after": cursor },
        });

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(SERVICE, status));
        }
        let payload: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| transport_error(SERVICE, &e))?;
        into_page(payload)
    }
}

fn into_page(payload: GraphQlResponse) -> Result<CatalogPage, ClientError> {
    if let Some(first) = payload.errors.first() {
        return Err(ClientError::permanent(format!(
            "catalog query rejected: {}",
            first.message
        )));
    }
    let entries = payload
        .data
        .and_then(|d| d.search_entries)
        .ok_or_else(|| ClientError::permanent("catalog response has no searchEntries"))?;
    Ok(CatalogPage {
        entries: entries.entries,
        next_cursor: entries.next_cursor.filter(|c| !c.is_empty()),
        total: entries.total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientErrorKind;

    fn parse(value: serde_json::Value) -> Result<CatalogPage, ClientError> {
        into_page(serde_json::from_value(value).expect("payload"))
    }

    #[test]
    fn parses_entries_and_cursor() {
        let page = parse(json!({
            "data": { "searchEntries": {
                "total": 3,
                "nextCursor": "c2",
                "entries": [
                    { "id": "e1", "name": "team/cells", "bucket": "lab", "topHash": "abc" },
                    { "id": "e2", "name": "raw/a.csv", "physicalKey": "s3://lab/raw/a.csv" }
                ]
            }}
        }))
        .expect("page");
        assert_eq!(page.total, Some(3));
        assert_eq!(page.next_cursor.as_deref(), Some("c2"));
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].top_hash.as_deref(), Some("abc"));
    }

    #[test]
    fn empty_cursor_means_last_page() {
        let page = parse(json!({
            "data": { "searchEntries": { "nextCursor": "", "entries": [] } }
        }))
        .expect("page");
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn graphql_errors_are_permanent() {
        let err = parse(json!({
            "data": null,
            "errors": [{ "message": "unknown catalog 'nope'" }]
        }))
        .expect_err("should fail");
        assert_eq!(err.kind, ClientErrorKind::Permanent);
        assert!(err.message.contains("unknown catalog"));
    }

    #[test]
    fn missing_data_is_permanent() {
        let err = parse(json!({})).expect_err("should fail");
        assert_eq!(err.kind, ClientErrorKind::Permanent);
    }

    #[test]
    fn invalid_endpoint_rejected() {
        assert!(GraphQlCatalogClient::new("::", &EngineConfig::default()).is_err());
    }
}
