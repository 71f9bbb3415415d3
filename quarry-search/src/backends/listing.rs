//! Raw object listing fallback.
//!
//! Storage listings support no native filtering, so this adapter walks
//! pages under the target prefix and keeps keys that contain every keyword
//! and carry a wanted extension. Size and date filters are left to the
//! aggregator. It can only serve bucket scope.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::backend::{cancellable, BackendCall, BackendOutput, SearchBackend};
use crate::clients::{ListedObject, ObjectListingClient};
use crate::error::BackendError;
use crate::types::{BackendId, RawHit, Scope};

/// Adapter over an [`ObjectListingClient`].
#[derive(Clone)]
pub struct ListingBackend {
    client: Arc<dyn ObjectListingClient>,
    max_pages: usize,
}

impl ListingBackend {
    /// Wrap an authenticated client, walking at most `max_pages` per call.
    pub fn new(client: Arc<dyn ObjectListingClient>, max_pages: usize) -> Self {
        Self {
            client,
            max_pages: max_pages.max(1),
        }
    }
}

/// Split a bucket target into bucket name and key prefix.
fn split_target(target: &str) -> (&str, &str) {
    let target = target.trim_start_matches("s3://");
    match target.split_once('/') {
        Some((bucket, prefix)) => (bucket, prefix),
        None => (target, ""),
    }
}

fn matches(object: &ListedObject, keywords: &[String], extensions: &[String]) -> bool {
    if object.key.ends_with('/') {
        return false;
    }
    let key = urlencoding::decode(&object.key)
        .map(|k| k.to_lowercase())
        .unwrap_or_else(|_| object.key.to_lowercase());
    if !keywords.iter().all(|k| key.contains(k.as_str())) {
        return false;
    }
    extensions.is_empty() || extensions.iter().any(|ext| key.ends_with(&format!(".{ext}")))
}

impl SearchBackend for ListingBackend {
    async fn execute(
        &self,
        call: &BackendCall,
        cancel: &CancellationToken,
    ) -> Result<BackendOutput, BackendError> {
        if call.count_only {
            return Err(BackendError::CountUnsupported(BackendId::Listing));
        }
        let target = match (call.scope, call.target.as_deref()) {
            (Scope::Bucket, Some(target)) => target,
            (Scope::Bucket, None) => {
                return Err(BackendError::Permanent("listing needs a bucket target".into()));
            }
            (scope, _) => {
                return Err(BackendError::Permanent(format!(
                    "listing cannot serve {scope} scope"
                )));
            }
        };
        let (bucket, prefix) = split_target(target);
        let keywords: Vec<String> = call
            .parsed
            .text()
            .map(|t| t.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default();
        let extensions = &call.filters().extensions;

        let mut hits: Vec<RawHit> = Vec::new();
        let mut token: Option<String> = None;

        for _ in 0..self.max_pages {
            let page =
                cancellable(cancel, self.client.list(bucket, prefix, token.as_deref())).await?;
            hits.extend(
                page.objects
                    .into_iter()
                    .filter(|o| matches(o, &keywords, extensions))
                    .map(RawHit::Listing),
            );
            if hits.len() >= call.limit {
                break;
            }
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        hits.truncate(call.limit);
        Ok(BackendOutput::Hits { hits, total: None })
    }

    fn id(&self) -> BackendId {
        BackendId::Listing
    }
}
