//! HTTP backend clients against mock servers.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quarry_search::clients::{
    CatalogClient, CatalogFilter, ElasticsearchClient, FullTextClient, FullTextQuery,
    GraphQlCatalogClient,
};
use quarry_search::error::ClientErrorKind;
use quarry_search::{EngineConfig, Scope, SearchFilters};

fn query(scope: Scope, target: Option<&str>, text: Option<&str>) -> FullTextQuery {
    FullTextQuery {
        text: text.map(str::to_owned),
        scope,
        target: target.map(str::to_owned),
        filters: SearchFilters::default(),
        limit: 10,
    }
}

fn fulltext(server: &MockServer) -> ElasticsearchClient {
    ElasticsearchClient::new(&server.uri(), "*", &EngineConfig::default()).expect("client")
}

fn catalog(server: &MockServer) -> GraphQlCatalogClient {
    GraphQlCatalogClient::new(&format!("{}/graphql", server.uri()), &EngineConfig::default())
        .expect("client")
}

// ---------------------------------------------------------------------------
// Full-text index
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_parses_objects_and_packages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/lab,lab_packages/_search"))
        .and(body_partial_json(json!({ "size": 10, "track_total_hits": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {
                "total": { "value": 2, "relation": "eq" },
                "hits": [
                    {
                        "_index": "lab",
                        "_score": 3.5,
                        "_source": {
                            "key": "raw/a.csv",
                            "size": 120,
                            "last_modified": "2024-03-01T10:00:00Z",
                            "comment": "first run"
                        }
                    },
                    {
                        "_index": "lab_packages",
                        "_score": 1.0,
                        "_source": { "handle": "team/cells", "hash": "ABC123" }
                    }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = fulltext(&server)
        .query(&query(Scope::Bucket, Some("lab"), Some("cells")))
        .await
        .expect("search");

    assert_eq!(page.total, Some(2));
    assert_eq!(page.hits.len(), 2);

    let object = &page.hits[0];
    assert_eq!(object.bucket, "lab");
    assert_eq!(object.key.as_deref(), Some("raw/a.csv"));
    assert_eq!(object.size, Some(120));
    assert!(object.last_modified.is_some());
    assert_eq!(
        object.metadata.as_ref().expect("metadata")["comment"],
        "first run"
    );

    let package = &page.hits[1];
    assert_eq!(package.bucket, "lab");
    assert_eq!(package.key, None);
    assert_eq!(package.package_name.as_deref(), Some("team/cells"));
    assert_eq!(package.top_hash.as_deref(), Some("ABC123"));
}

#[tokio::test]
async fn count_reads_count_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/*/_count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 1234 })))
        .expect(1)
        .mount(&server)
        .await;

    let count = fulltext(&server)
        .count(&query(Scope::Global, None, Some("genome")))
        .await
        .expect("count");
    assert_eq!(count, 1234);
}

#[tokio::test]
async fn server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = fulltext(&server)
        .query(&query(Scope::Global, None, None))
        .await
        .expect_err("503");
    assert_eq!(err.kind, ClientErrorKind::Transient);
    assert!(err.message.contains("503"));
}

#[tokio::test]
async fn forbidden_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = fulltext(&server)
        .count(&query(Scope::Global, None, None))
        .await
        .expect_err("403");
    assert_eq!(err.kind, ClientErrorKind::Permanent);
}

#[tokio::test]
async fn malformed_body_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
        .mount(&server)
        .await;

    let err = fulltext(&server)
        .query(&query(Scope::Global, None, None))
        .await
        .expect_err("malformed");
    assert_eq!(err.kind, ClientErrorKind::Permanent);
}

// ---------------------------------------------------------------------------
// GraphQL catalog
// ---------------------------------------------------------------------------

#[tokio::test]
async fn catalog_page_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "variables": { "filter": { "text": "genome", "first": 25 }, "after": "c1" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "searchEntries": {
                    "total": 40,
                    "nextCursor": "c2",
                    "entries": [
                        {
                            "id": "e1",
                            "name": "genome.csv",
                            "bucket": "lab",
                            "physicalKey": "s3://lab/raw/genome.csv",
                            "size": 10
                        }
                    ]
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = CatalogFilter {
        text: Some("genome".into()),
        first: 25,
        ..Default::default()
    };
    let page = catalog(&server)
        .search_entries(&filter, Some("c1"))
        .await
        .expect("page");

    assert_eq!(page.total, Some(40));
    assert_eq!(page.next_cursor.as_deref(), Some("c2"));
    assert_eq!(page.entries.len(), 1);
    assert_eq!(
        page.entries[0].physical_key.as_deref(),
        Some("s3://lab/raw/genome.csv")
    );
}

#[tokio::test]
async fn graphql_errors_are_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "unknown field first" }]
        })))
        .mount(&server)
        .await;

    let err = catalog(&server)
        .search_entries(&CatalogFilter::default(), None)
        .await
        .expect_err("rejected");
    assert_eq!(err.kind, ClientErrorKind::Permanent);
    assert_eq!(err.message, "catalog query rejected: unknown field first");
}

#[tokio::test]
async fn catalog_throttling_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = catalog(&server)
        .search_entries(&CatalogFilter::default(), None)
        .await
        .expect_err("429");
    assert_eq!(err.kind, ClientErrorKind::Transient);
}
