//! Human-readable account of how a response was produced.

use serde::{Deserialize, Serialize};

use crate::types::{
    BackendId, BackendReport, ParsedQuery, QueryIntent, ResultItem, SearchFilters,
};

/// Why the engine returned what it returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    /// How the query text was understood.
    pub query: QueryExplanation,
    /// Each backend's outcome, in response order.
    pub backends: Vec<BackendReport>,
    /// Why each of the top items matched.
    pub top_items: Vec<ItemExplanation>,
}

/// Parser output, as shown to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryExplanation {
    /// The query exactly as received.
    pub raw_query: String,
    /// Extracted search terms.
    pub keywords: Vec<String>,
    /// Extensions recognised in the query text.
    pub inferred_extensions: Vec<String>,
    /// Filters actually applied.
    pub effective_filters: SearchFilters,
    /// Query classification.
    pub intent: QueryIntent,
}

/// Match reasons for one returned item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemExplanation {
    /// 1-based rank in the response.
    pub rank: usize,
    /// Item identity.
    pub identity: String,
    /// Backends that found it.
    pub matched_by: Vec<BackendId>,
    /// Keywords visible in its path or metadata.
    pub matched_keywords: Vec<String>,
    /// Active filters it satisfied, e.g. `extension=csv`.
    pub matched_filters: Vec<String>,
    /// Informational score.
    pub score: f64,
}

/// Build an [`Explanation`] covering the first `top_n` items.
pub fn explain(
    parsed: &ParsedQuery,
    items: &[ResultItem],
    backends: &[BackendReport],
    top_n: usize,
) -> Explanation {
    let query = QueryExplanation {
        raw_query: parsed.raw_query.clone(),
        keywords: parsed.keywords.clone(),
        inferred_extensions: parsed.inferred_extensions.iter().cloned().collect(),
        effective_filters: parsed.filters.clone(),
        intent: parsed.intent,
    };

    let top_items = items
        .iter()
        .take(top_n)
        .enumerate()
        .map(|(i, item)| ItemExplanation {
            rank: i + 1,
            identity: item.identity.clone(),
            matched_by: item.source_backends.iter().copied().collect(),
            matched_keywords: matched_keywords(item, &parsed.keywords),
            matched_filters: matched_filters(item, &parsed.filters),
            score: item.score,
        })
        .collect();

    Explanation {
        query,
        backends: backends.to_vec(),
        top_items,
    }
}

fn matched_keywords(item: &ResultItem, keywords: &[String]) -> Vec<String> {
    let mut haystack = item.display_path.to_lowercase();
    if let Some(metadata) = &item.metadata {
        haystack.push(' ');
        haystack.push_str(&serde_json::Value::Object(metadata.clone()).to_string().to_lowercase());
    }
    keywords
        .iter()
        .filter(|k| haystack.contains(k.trim()))
        .cloned()
        .collect()
}

fn matched_filters(item: &ResultItem, filters: &SearchFilters) -> Vec<String> {
    let mut out = Vec::new();
    let path = item.display_path.to_lowercase();
    if let Some(ext) = filters
        .extensions
        .iter()
        .find(|e| path.ends_with(&format!(".{e}")))
    {
        out.push(format!("extension={ext}"));
    }
    if let (Some(min), Some(size)) = (filters.min_size, item.size_bytes) {
        out.push(format!("size>={min} ({size})"));
    }
    if let (Some(max), Some(size)) = (filters.max_size, item.size_bytes) {
        out.push(format!("size<={max} ({size})"));
    }
    if let (Some(after), Some(_)) = (filters.modified_after, item.last_modified) {
        out.push(format!("modified>={}", after.to_rfc3339()));
    }
    if let (Some(before), Some(_)) = (filters.modified_before, item.last_modified) {
        out.push(format!("modified<{}", before.to_rfc3339()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse;
    use crate::types::{BackendStatus, ItemKind};

    fn item(path: &str, size: Option<u64>) -> ResultItem {
        ResultItem {
            identity: format!("s3://{path}"),
            kind: ItemKind::Object,
            display_path: path.to_string(),
            bucket: None,
            size_bytes: size,
            last_modified: None,
            source_backends: [BackendId::FullText, BackendId::Listing]
                .into_iter()
                .collect(),
            score: 1.8,
            metadata: None,
            content_preview: None,
        }
    }

    fn report() -> BackendReport {
        BackendReport {
            id: "fulltext".into(),
            status: BackendStatus::Ok,
            latency_ms: 12,
            hit_count: 2,
            error_message: None,
        }
    }

    #[test]
    fn explains_query_and_backends() {
        let parsed = parse("genome csv files", &SearchFilters::default());
        let e = explain(&parsed, &[], &[report()], 5);
        assert_eq!(e.query.keywords, vec!["genome"]);
        assert_eq!(e.query.inferred_extensions, vec!["csv"]);
        assert_eq!(e.query.intent, QueryIntent::Structured);
        assert_eq!(e.backends, vec![report()]);
        assert!(e.top_items.is_empty());
    }

    #[test]
    fn annotates_top_items_only() {
        let parsed = parse("genome csv files", &SearchFilters::default());
        let items = vec![
            item("lab/genome_a.csv", Some(5)),
            item("lab/other.csv", None),
            item("lab/genome_b.csv", None),
        ];
        let e = explain(&parsed, &items, &[], 2);
        assert_eq!(e.top_items.len(), 2);
        assert_eq!(e.top_items[0].rank, 1);
        assert_eq!(e.top_items[0].matched_keywords, vec!["genome"]);
        assert_eq!(e.top_items[0].matched_filters, vec!["extension=csv"]);
        assert_eq!(
            e.top_items[0].matched_by,
            vec![BackendId::FullText, BackendId::Listing]
        );
        assert!(e.top_items[1].matched_keywords.is_empty());
    }

    #[test]
    fn size_filter_reported_with_actual_size() {
        let parsed = parse("larger than 1kb", &SearchFilters::default());
        let e = explain(&parsed, &[item("lab/big.bin", Some(4096))], &[], 5);
        assert_eq!(e.top_items[0].matched_filters, vec!["size>=1024 (4096)"]);
    }

    #[test]
    fn serialises_camel_case() {
        let parsed = parse("x", &SearchFilters::default());
        let json = serde_json::to_value(explain(&parsed, &[], &[], 5)).expect("serialize");
        assert!(json["query"].get("rawQuery").is_some());
        assert!(json.get("topItems").is_some());
    }
}
