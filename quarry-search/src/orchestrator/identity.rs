//! Canonical identity keys for deduplication.
//!
//! Two hits denote the same thing exactly when their identity strings are
//! equal:
//!
//! - objects: `s3://<bucket>/<key>` with the key percent-decoded and any
//!   leading slash removed
//! - package revisions: `quilt+pkg:<name>@<top hash>` (hash lowercased)
//! - catalog entries with no physical location: `catalog:<id>`

use url::Url;

/// Identity for a stored object. `None` when bucket or key is empty.
///
/// ```
/// use quarry_search::orchestrator::identity::object_identity;
///
/// assert_eq!(
///     object_identity("lab", "/raw/my%20file.csv").as_deref(),
///     Some("s3://lab/raw/my file.csv")
/// );
/// ```
pub fn object_identity(bucket: &str, key: &str) -> Option<String> {
    let bucket = bucket.trim();
    let key = decode_key(key);
    let key = key.trim_start_matches('/');
    if bucket.is_empty() || key.is_empty() {
        return None;
    }
    Some(format!("s3://{bucket}/{key}"))
}

/// Split an `s3://bucket/key` URI into bucket and key.
///
/// The key keeps its percent-encoding; [`object_identity`] decodes it.
/// Query strings (such as `?versionId=`) and fragments are ignored.
pub fn parse_object_uri(uri: &str) -> Option<(String, String)> {
    let parsed = Url::parse(uri.trim()).ok()?;
    if parsed.scheme() != "s3" {
        return None;
    }
    let bucket = parsed.host_str()?.to_owned();
    let key = parsed.path().trim_start_matches('/').to_owned();
    if bucket.is_empty() || key.is_empty() {
        return None;
    }
    Some((bucket, key))
}

/// Identity for a package revision. `None` when name or hash is empty.
pub fn package_identity(name: &str, top_hash: &str) -> Option<String> {
    let name = name.trim().trim_matches('/');
    let hash = top_hash.trim().to_ascii_lowercase();
    if name.is_empty() || hash.is_empty() {
        return None;
    }
    Some(format!("quilt+pkg:{name}@{hash}"))
}

/// Identity for a catalog entry without a physical location.
pub fn entry_identity(id: &str) -> Option<String> {
    let id = id.trim();
    (!id.is_empty()).then(|| format!("catalog:{id}"))
}

pub(crate) fn decode_key(key: &str) -> String {
    urlencoding::decode(key)
        .map(|k| k.into_owned())
        .unwrap_or_else(|_| key.to_owned())
}
