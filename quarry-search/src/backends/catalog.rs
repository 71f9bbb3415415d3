//! Catalog graph adapter. Pages through `searchEntries` with a cursor.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::backend::{cancellable, BackendCall, BackendOutput, SearchBackend};
use crate::clients::{CatalogClient, CatalogFilter};
use crate::error::BackendError;
use crate::types::{BackendId, RawHit, Scope};

/// Largest page requested from the catalog.
const MAX_PAGE_SIZE: usize = 100;

/// Adapter over a [`CatalogClient`].
#[derive(Clone)]
pub struct CatalogBackend {
    client: Arc<dyn CatalogClient>,
    max_pages: usize,
}

impl CatalogBackend {
    /// Wrap an authenticated client, fetching at most `max_pages` per call.
    pub fn new(client: Arc<dyn CatalogClient>, max_pages: usize) -> Self {
        Self {
            client,
            max_pages: max_pages.max(1),
        }
    }

    fn native_filter(call: &BackendCall) -> CatalogFilter {
        let filters = call.filters();
        let (catalog, package) = match call.scope {
            Scope::Catalog => (call.target.clone(), None),
            Scope::Package => (None, call.target.clone()),
            Scope::Global | Scope::Bucket => (None, None),
        };
        CatalogFilter {
            text: call.parsed.text(),
            catalog,
            package,
            extensions: filters.extensions.clone(),
            min_size: filters.min_size,
            max_size: filters.max_size,
            modified_after: filters.modified_after,
            modified_before: filters.modified_before,
            first: call.limit.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

impl SearchBackend for CatalogBackend {
    async fn execute(
        &self,
        call: &BackendCall,
        cancel: &CancellationToken,
    ) -> Result<BackendOutput, BackendError> {
        if call.count_only {
            return Err(BackendError::CountUnsupported(BackendId::Catalog));
        }

        let filter = Self::native_filter(call);
        let mut hits: Vec<RawHit> = Vec::new();
        let mut total = None;
        let mut cursor: Option<String> = None;

        for page_no in 0..self.max_pages {
            let page = cancellable(cancel, self.client.search_entries(&filter, cursor.as_deref()))
                .await?;
            if page_no == 0 {
                total = page.total;
            }
            hits.extend(page.entries.into_iter().map(RawHit::Catalog));

            match page.next_cursor {
                Some(next) if hits.len() < call.limit => cursor = Some(next),
                _ => break,
            }
        }

        hits.truncate(call.limit);
        Ok(BackendOutput::Hits { hits, total })
    }

    fn id(&self) -> BackendId {
        BackendId::Catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{CatalogEntry, CatalogPage};
    use crate::error::ClientError;
    use crate::query::parse;
    use crate::types::SearchFilters;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves `pages` pages of `per_page` entries each.
    struct PagedClient {
        pages: usize,
        per_page: usize,
        calls: AtomicUsize,
        filters: Mutex<Vec<CatalogFilter>>,
    }

    impl PagedClient {
        fn new(pages: usize, per_page: usize) -> Self {
            Self {
                pages,
                per_page,
                calls: AtomicUsize::new(0),
                filters: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CatalogClient for PagedClient {
        async fn search_entries(
            &self,
            filter: &CatalogFilter,
            cursor: Option<&str>,
        ) -> Result<CatalogPage, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut seen) = self.filters.lock() {
                seen.push(filter.clone());
            }
            let page: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
            let entries = (0..self.per_page)
                .map(|i| CatalogEntry {
                    id: format!("p{page}-{i}"),
                    name: format!("entry {page}-{i}"),
                    ..Default::default()
                })
                .collect();
            let next_cursor = (page + 1 < self.pages).then(|| (page + 1).to_string());
            Ok(CatalogPage {
                entries,
                next_cursor,
                total: Some((self.pages * self.per_page) as u64),
            })
        }
    }

    fn call(limit: usize, scope: Scope, target: Option<&str>) -> BackendCall {
        BackendCall {
            parsed: Arc::new(parse("cells", &SearchFilters::default())),
            scope,
            target: target.map(str::to_owned),
            limit,
            count_only: false,
        }
    }

    #[tokio::test]
    async fn pages_until_limit_reached() {
        let client = Arc::new(PagedClient::new(5, 4));
        let backend = CatalogBackend::new(client.clone(), 10);
        let out = backend
            .execute(&call(10, Scope::Global, None), &CancellationToken::new())
            .await
            .expect("execute");
        assert_eq!(out.hit_count(), 10);
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_at_last_page() {
        let client = Arc::new(PagedClient::new(2, 3));
        let backend = CatalogBackend::new(client.clone(), 10);
        let out = backend
            .execute(&call(50, Scope::Global, None), &CancellationToken::new())
            .await
            .expect("execute");
        assert_eq!(out.hit_count(), 6);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn page_bound_respected() {
        let client = Arc::new(PagedClient::new(100, 1));
        let backend = CatalogBackend::new(client.clone(), 3);
        let out = backend
            .execute(&call(50, Scope::Global, None), &CancellationToken::new())
            .await
            .expect("execute");
        assert_eq!(out.hit_count(), 3);
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn scope_target_routed_to_filter() {
        let client = Arc::new(PagedClient::new(1, 1));
        let backend = CatalogBackend::new(client.clone(), 1);
        backend
            .execute(
                &call(5, Scope::Package, Some("team/cells")),
                &CancellationToken::new(),
            )
            .await
            .expect("execute");
        let seen = client.filters.lock().expect("lock");
        assert_eq!(seen[0].package.as_deref(), Some("team/cells"));
        assert!(seen[0].catalog.is_none());
        assert_eq!(seen[0].text.as_deref(), Some("cells"));
        assert_eq!(seen[0].first, 5);
    }

    #[tokio::test]
    async fn count_only_is_unsupported() {
        let client = Arc::new(PagedClient::new(1, 1));
        let backend = CatalogBackend::new(client.clone(), 1);
        let mut c = call(5, Scope::Global, None);
        c.count_only = true;
        let err = backend
            .execute(&c, &CancellationToken::new())
            .await
            .expect_err("unsupported");
        assert_eq!(err, BackendError::CountUnsupported(BackendId::Catalog));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }
}
