//! Merge result items that share an identity.
//!
//! Items must arrive in backend-priority order (and native order within a
//! backend) so that the first occurrence of an identity is the one from the
//! highest-priority backend. On merge:
//!
//! - `source_backends` becomes the union
//! - `score` adds the contribution of each newly seen backend
//! - unknown size / modification time / bucket are filled in from later hits
//! - metadata keys are unioned; on conflict the earlier backend's non-null
//!   value wins, and a later non-null value replaces an earlier null
//!
//! Output keeps first-insertion order.

use std::collections::HashMap;

use crate::types::ResultItem;

/// Deduplicate `items` by identity.
pub fn deduplicate(items: Vec<ResultItem>) -> Vec<ResultItem> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut merged: Vec<ResultItem> = Vec::with_capacity(items.len());

    for item in items {
        match index.get(&item.identity) {
            Some(&pos) => merge_into(&mut merged[pos], item),
            None => {
                index.insert(item.identity.clone(), merged.len());
                merged.push(item);
            }
        }
    }
    merged
}

fn merge_into(kept: &mut ResultItem, other: ResultItem) {
    let new_backends: Vec<_> = other
        .source_backends
        .iter()
        .filter(|b| !kept.source_backends.contains(b))
        .copied()
        .collect();
    if new_backends.is_empty() {
        // Same backend listed the item twice; keep its better position.
        kept.score = kept.score.max(other.score);
    } else {
        kept.score += other.score;
        kept.source_backends.extend(new_backends);
    }

    kept.size_bytes = kept.size_bytes.or(other.size_bytes);
    kept.last_modified = kept.last_modified.or(other.last_modified);
    if kept.bucket.is_none() {
        kept.bucket = other.bucket;
    }

    if let Some(theirs) = other.metadata {
        match kept.metadata.as_mut() {
            Some(mine) => {
                for (key, value) in theirs {
                    match mine.get_mut(&key) {
                        Some(existing) if existing.is_null() => *existing = value,
                        Some(_) => {}
                        None => {
                            mine.insert(key, value);
                        }
                    }
                }
            }
            None => kept.metadata = Some(theirs),
        }
    }
}
