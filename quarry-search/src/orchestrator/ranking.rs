//! Deterministic ranking of deduplicated items.
//!
//! Order, most significant first:
//!
//! 1. number of backends that found the item (descending)
//! 2. priority of the highest-priority backend that found it
//! 3. last modification time (newest first, unknown last)
//! 4. first-insertion order
//!
//! The numeric `score` is informational and never affects order:
//!
//! ```text
//! score = Σ backend_weight * 1.0 / (1.0 + position_index * 0.1)
//! ```

use std::cmp::Ordering;

use crate::types::{BackendId, ResultItem};

/// Score contribution of a hit at 0-based `position` in `backend`'s list.
pub fn position_score(backend: BackendId, position: usize) -> f64 {
    let position_decay = 1.0 / (1.0 + position as f64 * 0.1);
    backend.weight() * position_decay
}

/// Compare two items for ranking. `Ordering::Less` means `a` ranks first.
///
/// Items must come from deduplication, so `source_backends` is non-empty.
pub fn compare(a: &ResultItem, b: &ResultItem) -> Ordering {
    b.source_backends
        .len()
        .cmp(&a.source_backends.len())
        .then_with(|| best_priority(a).cmp(&best_priority(b)))
        .then_with(|| match (a.last_modified, b.last_modified) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Sort `items` in place. The sort is stable, so ties keep insertion order.
pub fn rank(items: &mut [ResultItem]) {
    items.sort_by(compare);
}

fn best_priority(item: &ResultItem) -> usize {
    item.source_backends
        .first()
        .map_or(usize::MAX, BackendId::priority)
}
