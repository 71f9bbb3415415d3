//! Best-effort content previews for the final result items.
//!
//! Previews are fetched only for items that survive truncation, all at
//! once, each under its own time budget. A failed or slow fetch leaves the
//! item without a preview; it never fails the search. Excerpts are cached
//! by identity using [`moka`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::config::EngineConfig;
use crate::error::ClientError;
use crate::types::ResultItem;

/// Maximum number of cached excerpts.
const MAX_CACHE_ENTRIES: u64 = 2_000;

/// Suffix appended to excerpts that were cut short.
const ELLIPSIS: char = '…';

/// Reads the beginning of an item's content.
#[async_trait]
pub trait PreviewSource: Send + Sync {
    /// Return up to roughly `max_bytes` of leading text, or `None` when the
    /// item has no textual content worth previewing.
    async fn fetch_head(
        &self,
        item: &ResultItem,
        max_bytes: usize,
    ) -> Result<Option<String>, ClientError>;
}

/// Fetches, trims, and caches previews.
pub struct PreviewFetcher {
    source: Arc<dyn PreviewSource>,
    cache: Option<Cache<String, String>>,
    max_chars: usize,
    timeout: Duration,
}

impl PreviewFetcher {
    /// Create a fetcher using the preview settings in `config`.
    pub fn new(source: Arc<dyn PreviewSource>, config: &EngineConfig) -> Self {
        let cache = (config.preview_cache_ttl_seconds > 0).then(|| {
            Cache::builder()
                .max_capacity(MAX_CACHE_ENTRIES)
                .time_to_live(Duration::from_secs(config.preview_cache_ttl_seconds))
                .build()
        });
        Self {
            source,
            cache,
            max_chars: config.preview_max_chars.max(1),
            timeout: config.preview_timeout(),
        }
    }

    /// Attach previews to `items` in place.
    pub async fn attach(&self, items: &mut [ResultItem]) {
        let previews =
            futures::future::join_all(items.iter().map(|item| self.preview_for(item))).await;
        for (item, preview) in items.iter_mut().zip(previews) {
            item.content_preview = preview;
        }
    }

    async fn preview_for(&self, item: &ResultItem) -> Option<String> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&item.identity).await {
                return Some(hit);
            }
        }

        let max_bytes = self.max_chars.saturating_mul(4);
        let raw = match tokio::time::timeout(self.timeout, self.source.fetch_head(item, max_bytes))
            .await
        {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                tracing::debug!(identity = %item.identity, error = %e, "preview fetch failed");
                return None;
            }
            Err(_) => {
                tracing::debug!(identity = %item.identity, "preview fetch timed out");
                return None;
            }
        };

        let excerpt = excerpt(&raw, self.max_chars)?;
        if let Some(cache) = &self.cache {
            cache.insert(item.identity.clone(), excerpt.clone()).await;
        }
        Some(excerpt)
    }
}

/// Collapse whitespace to single spaces and cut to `max_chars` characters.
///
/// Returns `None` for blank input.
pub fn excerpt(text: &str, max_chars: usize) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    if collapsed.chars().count() <= max_chars {
        return Some(collapsed);
    }
    let mut cut: String = collapsed.chars().take(max_chars.saturating_sub(1)).collect();
    cut.truncate(cut.trim_end().len());
    cut.push(ELLIPSIS);
    Some(cut)
}
