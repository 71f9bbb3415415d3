//! Result aggregation: normalise, deduplicate, post-filter, rank, truncate.

use std::collections::BTreeMap;

use crate::types::{BackendId, RawHit, ResultItem, SearchFilters, SearchRequest};

use super::dedup::deduplicate;
use super::filter::passes;
use super::normalize::normalize;
use super::ranking::rank;

/// Turn per-backend raw hits into the final ordered item list.
///
/// `filters` are the effective filters (explicit request filters merged
/// over those inferred from the query). Hits that cannot be normalised are
/// logged and dropped. Metadata is stripped unless the request asked for
/// it; previews are attached later by the caller.
pub fn aggregate(
    raw_hits: BTreeMap<BackendId, Vec<RawHit>>,
    request: &SearchRequest,
    filters: &SearchFilters,
) -> Vec<ResultItem> {
    let mut normalized: Vec<ResultItem> = Vec::new();
    for (backend, hits) in raw_hits {
        for (position, hit) in hits.into_iter().enumerate() {
            match normalize(hit, position) {
                Ok(item) => normalized.push(item),
                Err(err) => tracing::warn!(backend = %backend, error = %err, "dropping hit"),
            }
        }
    }

    let before = normalized.len();
    let mut items = deduplicate(normalized);
    let unique = items.len();
    items.retain(|item| passes(item, filters));
    tracing::trace!(
        normalized = before,
        unique,
        filtered = items.len(),
        "aggregation counts"
    );

    rank(&mut items);

    let limit = usize::try_from(request.limit.max(0)).unwrap_or(usize::MAX);
    let offset = filters.offset.unwrap_or(0);
    let mut items: Vec<ResultItem> = items.into_iter().skip(offset).take(limit).collect();

    if !request.include_metadata {
        for item in &mut items {
            item.metadata = None;
        }
    }
    items
}
