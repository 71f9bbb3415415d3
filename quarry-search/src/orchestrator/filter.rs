//! Post-filters applied after deduplication.
//!
//! Backends may ignore filters they cannot express natively, so every
//! filter is re-checked here. An item whose size or modification time is
//! unknown does not pass an active size or date filter.

use crate::types::{ItemKind, ResultItem, SearchFilters};

/// Whether `item` satisfies every filter in `filters`.
pub fn passes(item: &ResultItem, filters: &SearchFilters) -> bool {
    extension_ok(item, &filters.extensions)
        && size_ok(item.size_bytes, filters.min_size, filters.max_size)
        && date_ok(item, filters)
}

fn extension_ok(item: &ResultItem, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    if item.kind == ItemKind::Package {
        return false;
    }
    let path = item.display_path.to_lowercase();
    extensions
        .iter()
        .any(|ext| path.ends_with(&format!(".{}", ext.to_lowercase())))
}

fn size_ok(size: Option<u64>, min: Option<u64>, max: Option<u64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(size) = size else {
        return false;
    };
    min.is_none_or(|m| size >= m) && max.is_none_or(|m| size <= m)
}

fn date_ok(item: &ResultItem, filters: &SearchFilters) -> bool {
    if filters.modified_after.is_none() && filters.modified_before.is_none() {
        return true;
    }
    let Some(modified) = item.last_modified else {
        return false;
    };
    filters.modified_after.is_none_or(|a| modified >= a)
        && filters.modified_before.is_none_or(|b| modified < b)
}
