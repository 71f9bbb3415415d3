//! Backend capability registry.
//!
//! Holds which backends exist, which scopes each serves, and whether each
//! is healthy or marked down. Readers take an immutable snapshot
//! (`Arc<Vec<RegisteredBackend>>`); writers publish a fresh snapshot, so a
//! search in flight never observes a half-applied change.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use serde::Serialize;

use crate::backend::Backend;
use crate::config::EngineConfig;
use crate::health::{CircuitState, HealthTracker};
use crate::types::{BackendId, BackendReport, Scope};

/// Reason recorded for a backend an operator marked down.
pub const MARKED_DOWN: &str = "marked down";

/// Capability and state of one registered backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendDescriptor {
    /// Which backend.
    pub id: BackendId,
    /// Scopes it can serve.
    pub supported_scopes: BTreeSet<Scope>,
    /// Advisory health from recent outcomes.
    pub healthy: bool,
    /// Excluded from selection until marked up again.
    pub marked_down: bool,
}

impl BackendDescriptor {
    /// Whether this backend can serve `scope`.
    pub fn supports(&self, scope: Scope) -> bool {
        self.supported_scopes.contains(&scope)
    }
}

/// A descriptor paired with its adapter.
#[derive(Debug, Clone)]
pub struct RegisteredBackend {
    /// Capability snapshot.
    pub descriptor: BackendDescriptor,
    /// The adapter itself.
    pub backend: Arc<Backend>,
}

/// Result of [`BackendRegistry::select_backends`].
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Backends to invoke, in priority order.
    pub selected: Vec<RegisteredBackend>,
    /// Backends that will not be invoked, with the reason.
    pub skipped: Vec<BackendReport>,
}

/// Registry of available backends.
#[derive(Debug)]
pub struct BackendRegistry {
    snapshot: RwLock<Arc<Vec<RegisteredBackend>>>,
    health: Mutex<HealthTracker>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl BackendRegistry {
    /// Create an empty registry using the health settings in `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Vec::new())),
            health: Mutex::new(HealthTracker::new(
                config.failure_threshold,
                Duration::from_secs(config.health_cooldown_secs),
            )),
        }
    }

    /// Register `backend` for its default scopes, replacing any backend with the same id.
    pub fn register(&self, backend: Backend) {
        let scopes = backend.default_scopes().to_vec();
        self.register_with_scopes(backend, scopes);
    }

    /// Register `backend` for an explicit scope set.
    ///
    /// The listing backend never serves catalog scope; that scope is dropped
    /// from its set if present.
    pub fn register_with_scopes(&self, backend: Backend, scopes: impl IntoIterator<Item = Scope>) {
        let id = backend.id();
        let mut supported_scopes: BTreeSet<Scope> = scopes.into_iter().collect();
        if id == BackendId::Listing && supported_scopes.remove(&Scope::Catalog) {
            tracing::warn!(backend = %id, "listing backend cannot serve catalog scope; dropped");
        }
        let entry = RegisteredBackend {
            descriptor: BackendDescriptor {
                id,
                supported_scopes,
                healthy: true,
                marked_down: false,
            },
            backend: Arc::new(backend),
        };
        self.publish(|entries| {
            entries.retain(|e| e.descriptor.id != id);
            entries.push(entry);
            entries.sort_by_key(|e| e.descriptor.id);
        });
        tracing::debug!(backend = %id, "backend registered");
    }

    /// Current immutable snapshot.
    pub fn snapshot(&self) -> Arc<Vec<RegisteredBackend>> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Descriptors of every registered backend, in priority order.
    pub fn descriptors(&self) -> Vec<BackendDescriptor> {
        self.snapshot()
            .iter()
            .map(|e| e.descriptor.clone())
            .collect()
    }

    /// Mark a backend down (excluded from selection) or back up.
    ///
    /// Returns `false` when `id` is not registered.
    pub fn mark_down(&self, id: BackendId, down: bool) -> bool {
        let mut found = false;
        self.publish(|entries| {
            for entry in entries.iter_mut().filter(|e| e.descriptor.id == id) {
                entry.descriptor.marked_down = down;
                found = true;
            }
        });
        if found {
            tracing::info!(backend = %id, down, "backend availability changed");
        }
        found
    }

    /// Feed one invocation outcome into health tracking.
    ///
    /// The health lock is held until the new snapshot is published, so
    /// concurrent outcomes publish in the order they were recorded.
    pub fn record_outcome(&self, id: BackendId, success: bool) {
        let mut health = match self.health.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if success {
            health.record_success(id);
        } else {
            health.record_failure(id);
        }
        let healthy = health.is_healthy(id);

        let changed = self
            .snapshot()
            .iter()
            .any(|e| e.descriptor.id == id && e.descriptor.healthy != healthy);
        if !changed {
            return;
        }
        self.publish(|entries| {
            for entry in entries.iter_mut().filter(|e| e.descriptor.id == id) {
                entry.descriptor.healthy = healthy;
            }
        });
        drop(health);

        if healthy {
            tracing::info!(backend = %id, "backend healthy again");
        } else {
            tracing::warn!(backend = %id, "backend flagged unhealthy");
        }
    }

    /// `(backend, state, consecutive_failures)` for backends with recorded outcomes.
    pub fn health_report(&self) -> Vec<(BackendId, CircuitState, u32)> {
        match self.health.lock() {
            Ok(guard) => guard.health_report(),
            Err(poisoned) => poisoned.into_inner().health_report(),
        }
    }

    /// Choose the backends to invoke for `scope`.
    ///
    /// With an empty `explicit` list every backend supporting the scope is
    /// a candidate. Otherwise each requested id is honoured if it is known,
    /// registered and supports the scope; the rest are reported as skipped
    /// with the reason. Marked-down backends are always skipped. Health is
    /// advisory and never excludes a backend.
    pub fn select_backends(&self, scope: Scope, explicit: &[String]) -> Selection {
        let snapshot = self.snapshot();
        let mut selection = Selection::default();

        let consider = |entry: &RegisteredBackend, selection: &mut Selection| {
            let d = &entry.descriptor;
            if !d.supports(scope) {
                selection.skipped.push(BackendReport::skipped(
                    d.id.name(),
                    format!("does not support {scope} scope"),
                ));
            } else if d.marked_down {
                selection
                    .skipped
                    .push(BackendReport::skipped(d.id.name(), MARKED_DOWN));
            } else {
                selection.selected.push(entry.clone());
            }
        };

        if explicit.is_empty() {
            for entry in snapshot.iter().filter(|e| e.descriptor.supports(scope)) {
                consider(entry, &mut selection);
            }
            return selection;
        }

        let mut seen: BTreeSet<BackendId> = BTreeSet::new();
        for raw in explicit {
            let Some(id) = BackendId::parse(raw) else {
                selection
                    .skipped
                    .push(BackendReport::skipped(raw.trim(), "unknown backend"));
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            match snapshot.iter().find(|e| e.descriptor.id == id) {
                Some(entry) => consider(entry, &mut selection),
                None => selection
                    .skipped
                    .push(BackendReport::skipped(id.name(), "not registered")),
            }
        }
        selection.selected.sort_by_key(|e| e.descriptor.id);
        selection
    }

    fn publish(&self, update: impl FnOnce(&mut Vec<RegisteredBackend>)) {
        let mut guard = match self.snapshot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut next: Vec<RegisteredBackend> = guard.as_ref().clone();
        update(&mut next);
        *guard = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{CatalogBackend, FullTextBackend, ListingBackend};
    use crate::clients::{
        CatalogClient, CatalogFilter, CatalogPage, FullTextClient, FullTextPage, FullTextQuery,
        ListingPage, ObjectListingClient,
    };
    use crate::error::ClientError;
    use crate::types::BackendStatus;
    use async_trait::async_trait;

    struct Nothing;

    #[async_trait]
    impl FullTextClient for Nothing {
        async fn query(&self, _q: &FullTextQuery) -> Result<FullTextPage, ClientError> {
            Ok(FullTextPage::default())
        }
        async fn count(&self, _q: &FullTextQuery) -> Result<u64, ClientError> {
            Ok(0)
        }
    }

    #[async_trait]
    impl CatalogClient for Nothing {
        async fn search_entries(
            &self,
            _f: &CatalogFilter,
            _c: Option<&str>,
        ) -> Result<CatalogPage, ClientError> {
            Ok(CatalogPage::default())
        }
    }

    #[async_trait]
    impl ObjectListingClient for Nothing {
        async fn list(
            &self,
            _b: &str,
            _p: &str,
            _t: Option<&str>,
        ) -> Result<ListingPage, ClientError> {
            Ok(ListingPage::default())
        }
    }

    fn full_registry() -> BackendRegistry {
        let registry = BackendRegistry::default();
        registry.register(Backend::Listing(ListingBackend::new(Arc::new(Nothing), 1)));
        registry.register(Backend::Catalog(CatalogBackend::new(Arc::new(Nothing), 1)));
        registry.register(Backend::FullText(FullTextBackend::new(Arc::new(Nothing))));
        registry
    }

    fn ids(selection: &Selection) -> Vec<BackendId> {
        selection.selected.iter().map(|e| e.descriptor.id).collect()
    }

    #[test]
    fn snapshot_sorted_by_priority() {
        let registry = full_registry();
        let order: Vec<_> = registry.descriptors().iter().map(|d| d.id).collect();
        assert_eq!(order, BackendId::all());
    }

    #[test]
    fn auto_selection_by_scope() {
        let registry = full_registry();
        assert_eq!(
            ids(&registry.select_backends(Scope::Bucket, &[])),
            vec![BackendId::FullText, BackendId::Listing]
        );
        assert_eq!(
            ids(&registry.select_backends(Scope::Catalog, &[])),
            vec![BackendId::FullText, BackendId::Catalog]
        );
        assert!(registry.select_backends(Scope::Global, &[]).skipped.is_empty());
    }

    #[test]
    fn listing_never_serves_catalog_scope() {
        let registry = BackendRegistry::default();
        registry.register_with_scopes(
            Backend::Listing(ListingBackend::new(Arc::new(Nothing), 1)),
            Scope::all().iter().copied(),
        );
        let d = &registry.descriptors()[0];
        assert!(!d.supports(Scope::Catalog));
        assert!(d.supports(Scope::Bucket));

        let selection = registry.select_backends(Scope::Catalog, &["listing".into()]);
        assert!(selection.selected.is_empty());
        assert_eq!(selection.skipped[0].id, "listing");
        assert_eq!(selection.skipped[0].status, BackendStatus::Skipped);
    }

    #[test]
    fn explicit_selection_reports_unknown_and_unsupported() {
        let registry = full_registry();
        let selection = registry.select_backends(
            Scope::Bucket,
            &["catalog".into(), "bogus".into(), "listing".into(), "listing".into()],
        );
        assert_eq!(ids(&selection), vec![BackendId::Listing]);
        let skipped: Vec<_> = selection
            .skipped
            .iter()
            .map(|r| (r.id.as_str(), r.error_message.clone().unwrap_or_default()))
            .collect();
        assert_eq!(
            skipped,
            vec![
                ("catalog", "does not support bucket scope".to_string()),
                ("bogus", "unknown backend".to_string()),
            ]
        );
    }

    #[test]
    fn explicit_selection_of_unregistered_backend() {
        let registry = BackendRegistry::default();
        registry.register(Backend::FullText(FullTextBackend::new(Arc::new(Nothing))));
        let selection = registry.select_backends(Scope::Global, &["catalog".into()]);
        assert!(selection.selected.is_empty());
        assert_eq!(
            selection.skipped[0].error_message.as_deref(),
            Some("not registered")
        );
    }

    #[test]
    fn marked_down_backend_is_skipped_and_restorable() {
        let registry = full_registry();
        assert!(registry.mark_down(BackendId::FullText, true));
        let selection = registry.select_backends(Scope::Global, &[]);
        assert_eq!(ids(&selection), vec![BackendId::Catalog]);
        assert_eq!(selection.skipped[0].error_message.as_deref(), Some(MARKED_DOWN));

        assert!(registry.mark_down(BackendId::FullText, false));
        assert_eq!(
            ids(&registry.select_backends(Scope::Global, &[])),
            vec![BackendId::FullText, BackendId::Catalog]
        );
    }

    #[test]
    fn mark_down_unknown_backend_returns_false() {
        let registry = BackendRegistry::default();
        assert!(!registry.mark_down(BackendId::Catalog, true));
    }

    #[test]
    fn unhealthy_backend_still_selected() {
        let registry = full_registry();
        for _ in 0..3 {
            registry.record_outcome(BackendId::Catalog, false);
        }
        let catalog = registry
            .descriptors()
            .into_iter()
            .find(|d| d.id == BackendId::Catalog)
            .expect("catalog");
        assert!(!catalog.healthy);
        assert!(ids(&registry.select_backends(Scope::Global, &[])).contains(&BackendId::Catalog));
    }

    #[test]
    fn old_snapshot_unchanged_by_updates() {
        let registry = full_registry();
        let before = registry.snapshot();
        registry.mark_down(BackendId::Catalog, true);
        assert!(before.iter().all(|e| !e.descriptor.marked_down));
        assert!(registry
            .snapshot()
            .iter()
            .any(|e| e.descriptor.marked_down));
    }

    #[test]
    fn re_registering_replaces_entry() {
        let registry = full_registry();
        registry.register(Backend::FullText(FullTextBackend::new(Arc::new(Nothing))));
        assert_eq!(registry.descriptors().len(), 3);
    }

    #[test]
    fn concurrent_outcomes_keep_flag_in_step_with_tracker() {
        let registry = full_registry();
        std::thread::scope(|s| {
            for worker in 0..8 {
                let registry = &registry;
                s.spawn(move || {
                    for i in 0..200 {
                        registry.record_outcome(BackendId::FullText, (i + worker) % 4 == 0);
                    }
                });
            }
        });

        let flagged = registry
            .descriptors()
            .into_iter()
            .find(|d| d.id == BackendId::FullText)
            .expect("fulltext")
            .healthy;
        let state = registry
            .health_report()
            .into_iter()
            .find(|(id, _, _)| *id == BackendId::FullText)
            .map(|(_, state, _)| state)
            .expect("tracked");
        assert_eq!(flagged, state != CircuitState::Open);
    }
}
