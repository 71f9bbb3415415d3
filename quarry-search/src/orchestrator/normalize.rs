//! Backend-native hits → [`ResultItem`]s.

use crate::clients::{CatalogEntry, FullTextHit, ListedObject, Metadata};
use crate::error::AggregationError;
use crate::types::{BackendId, ItemKind, RawHit, ResultItem};

use super::identity::{
    decode_key, entry_identity, object_identity, package_identity, parse_object_uri,
};
use super::ranking::position_score;

/// Characters of the top hash shown in a package display path.
const SHORT_HASH_LEN: usize = 10;

/// Normalise one raw hit found at `position` in its backend's result list.
///
/// # Errors
///
/// Returns [`AggregationError`] when the hit lacks the fields needed to
/// build an identity. Callers drop that hit and keep the rest.
pub fn normalize(hit: RawHit, position: usize) -> Result<ResultItem, AggregationError> {
    let backend = hit.backend();
    let mut normalized = match hit {
        RawHit::FullText(doc) => from_fulltext(doc)?,
        RawHit::Catalog(entry) => from_catalog(entry)?,
        RawHit::Listing(object) => from_listing(object)?,
    };
    normalized.source_backends.insert(backend);
    normalized.score = position_score(backend, position);
    Ok(normalized)
}

fn item(identity: String, kind: ItemKind, display_path: String) -> ResultItem {
    ResultItem {
        identity,
        kind,
        display_path,
        bucket: None,
        size_bytes: None,
        last_modified: None,
        source_backends: Default::default(),
        score: 0.0,
        metadata: None,
        content_preview: None,
    }
}

fn object_item(bucket: &str, key: &str) -> Option<ResultItem> {
    let identity = object_identity(bucket, key)?;
    let decoded = decode_key(key);
    let display = format!("{}/{}", bucket.trim(), decoded.trim_start_matches('/'));
    let mut it = item(identity, ItemKind::Object, display);
    it.bucket = Some(bucket.trim().to_owned());
    Some(it)
}

fn package_item(name: &str, top_hash: &str) -> Option<ResultItem> {
    let identity = package_identity(name, top_hash)?;
    let short: String = top_hash.trim().chars().take(SHORT_HASH_LEN).collect();
    let display = format!("{}@{}", name.trim().trim_matches('/'), short.to_ascii_lowercase());
    Some(item(identity, ItemKind::Package, display))
}

fn invalid(backend: BackendId, reason: impl Into<String>) -> AggregationError {
    AggregationError {
        backend,
        reason: reason.into(),
    }
}

fn from_fulltext(doc: FullTextHit) -> Result<ResultItem, AggregationError> {
    let located = match (&doc.key, &doc.package_name, &doc.top_hash) {
        (Some(key), _, _) => object_item(&doc.bucket, key),
        (None, Some(name), Some(hash)) => package_item(name, hash).map(|mut it| {
            it.bucket = Some(doc.bucket.clone()).filter(|b| !b.is_empty());
            it
        }),
        _ => None,
    };
    let mut it = located.ok_or_else(|| {
        invalid(BackendId::FullText, "document has neither object key nor package")
    })?;

    it.size_bytes = doc.size;
    it.last_modified = doc.last_modified;
    it.metadata = doc.metadata;
    Ok(it)
}

fn from_catalog(entry: CatalogEntry) -> Result<ResultItem, AggregationError> {
    let physical = entry.physical_key.as_deref().and_then(parse_object_uri);
    let located = if let Some((bucket, key)) = physical {
        object_item(&bucket, &key)
    } else if let Some(hash) = entry.top_hash.as_deref() {
        package_item(&entry.name, hash)
    } else {
        None
    };
    let mut it = located.or_else(|| {
        entry_identity(&entry.id).map(|id| {
            let display = if entry.name.trim().is_empty() {
                entry.id.trim().to_owned()
            } else {
                entry.name.trim().to_owned()
            };
            item(id, ItemKind::Entry, display)
        })
    })
    .ok_or_else(|| invalid(BackendId::Catalog, "entry has no id or location"))?;

    if it.bucket.is_none() {
        it.bucket = entry.bucket.filter(|b| !b.is_empty());
    }
    it.size_bytes = entry.size;
    it.last_modified = entry.modified;
    it.metadata = entry.metadata;
    Ok(it)
}

fn from_listing(object: ListedObject) -> Result<ResultItem, AggregationError> {
    let mut it = object_item(&object.bucket, &object.key)
        .ok_or_else(|| invalid(BackendId::Listing, "object has empty bucket or key"))?;
    it.size_bytes = object.size;
    it.last_modified = object.last_modified;
    it.metadata = object.etag.map(|etag| {
        let mut m = Metadata::new();
        m.insert("etag".into(), serde_json::Value::String(etag));
        m
    });
    Ok(it)
}
