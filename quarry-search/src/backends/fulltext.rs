//! Full-text index adapter. The only adapter that can count server-side.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::backend::{cancellable, BackendCall, BackendOutput, SearchBackend};
use crate::clients::{FullTextClient, FullTextQuery};
use crate::error::BackendError;
use crate::types::{BackendId, RawHit};

/// Adapter over a [`FullTextClient`].
#[derive(Clone)]
pub struct FullTextBackend {
    client: Arc<dyn FullTextClient>,
}

impl FullTextBackend {
    /// Wrap an authenticated client.
    pub fn new(client: Arc<dyn FullTextClient>) -> Self {
        Self { client }
    }

    fn native_query(call: &BackendCall) -> FullTextQuery {
        FullTextQuery {
            text: call.parsed.text(),
            scope: call.scope,
            target: call.target.clone(),
            filters: call.filters().clone(),
            limit: call.limit,
        }
    }
}

impl SearchBackend for FullTextBackend {
    async fn execute(
        &self,
        call: &BackendCall,
        cancel: &CancellationToken,
    ) -> Result<BackendOutput, BackendError> {
        let query = Self::native_query(call);

        if call.count_only {
            let count = cancellable(cancel, self.client.count(&query)).await?;
            return Ok(BackendOutput::Count(count));
        }

        let page = cancellable(cancel, self.client.query(&query)).await?;
        let mut hits: Vec<RawHit> = page.hits.into_iter().map(RawHit::FullText).collect();
        hits.truncate(call.limit);
        Ok(BackendOutput::Hits {
            hits,
            total: page.total,
        })
    }

    fn id(&self) -> BackendId {
        BackendId::FullText
    }
}
