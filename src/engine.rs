//! Engine construction from [`QuarryConfig`].
//!
//! The full-text and catalog backends use the bundled HTTP clients. The
//! listing backend has no bundled client; the embedding system supplies one
//! or the backend stays unregistered.

use std::sync::Arc;

use quarry_search::backends::{CatalogBackend, FullTextBackend, ListingBackend};
use quarry_search::clients::{ElasticsearchClient, GraphQlCatalogClient, ObjectListingClient};
use quarry_search::{Backend, BackendRegistry, Orchestrator, PreviewSource};

use crate::config::{QuarryConfig, ResolvedOverride};
use crate::error::{QuarryError, Result};

/// Collaborators the host cannot build from configuration alone.
#[derive(Default, Clone)]
pub struct Collaborators {
    /// Object listing client for the bucket fallback backend.
    pub listing: Option<Arc<dyn ObjectListingClient>>,
    /// Content reader for previews.
    pub previews: Option<Arc<dyn PreviewSource>>,
}

/// Build a ready orchestrator from validated configuration.
///
/// # Errors
///
/// Returns [`QuarryError::Config`] for invalid settings or endpoint URLs.
pub fn build_orchestrator(
    config: &QuarryConfig,
    collaborators: Collaborators,
) -> Result<Orchestrator> {
    let overrides = config.validate()?;
    let engine = &config.engine;
    let registry = Arc::new(BackendRegistry::new(engine));

    if let Some(section) = &config.fulltext {
        let client = ElasticsearchClient::new(&section.url, section.index_pattern.clone(), engine)?;
        register(
            &registry,
            Backend::FullText(FullTextBackend::new(Arc::new(client))),
            &overrides,
        );
    }
    if let Some(section) = &config.catalog {
        let client = GraphQlCatalogClient::new(&section.url, engine)?;
        register(
            &registry,
            Backend::Catalog(CatalogBackend::new(
                Arc::new(client),
                engine.catalog_max_pages,
            )),
            &overrides,
        );
    }
    if let Some(listing) = collaborators.listing {
        register(
            &registry,
            Backend::Listing(ListingBackend::new(listing, engine.listing_max_pages)),
            &overrides,
        );
    }

    for o in overrides.iter().filter(|o| o.down) {
        if !registry.mark_down(o.id, true) {
            tracing::warn!(backend = %o.id, "override marks down an unregistered backend");
        }
    }

    let registered = registry.descriptors();
    if registered.is_empty() {
        tracing::warn!("no search backends configured; every search will fail");
    } else {
        for d in &registered {
            tracing::info!(
                backend = %d.id,
                scopes = ?d.supported_scopes,
                marked_down = d.marked_down,
                "backend ready"
            );
        }
    }

    let orchestrator =
        Orchestrator::new(registry, engine.clone()).map_err(QuarryError::from)?;
    Ok(match collaborators.previews {
        Some(source) => orchestrator.with_preview_source(source),
        None => orchestrator,
    })
}

fn register(registry: &BackendRegistry, backend: Backend, overrides: &[ResolvedOverride]) {
    let scopes = overrides
        .iter()
        .find(|o| o.id == backend.id())
        .and_then(|o| o.scopes.clone());
    match scopes {
        Some(scopes) => registry.register_with_scopes(backend, scopes),
        None => registry.register(backend),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendOverride, CatalogSection, FullTextSection};
    use quarry_search::{BackendId, Scope};

    fn config() -> QuarryConfig {
        QuarryConfig {
            fulltext: Some(FullTextSection {
                url: "http://localhost:9200".into(),
                index_pattern: "*".into(),
            }),
            catalog: Some(CatalogSection {
                url: "http://localhost:4000/graphql".into(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn registers_configured_backends() {
        let orchestrator =
            build_orchestrator(&config(), Collaborators::default()).expect("build");
        let ids: Vec<BackendId> = orchestrator
            .registry()
            .descriptors()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![BackendId::FullText, BackendId::Catalog]);
    }

    #[test]
    fn overrides_apply_scopes_and_down() {
        let mut config = config();
        config.backends = vec![
            BackendOverride {
                id: "catalog".into(),
                scopes: Some(vec!["bucket".into()]),
                down: false,
            },
            BackendOverride {
                id: "fulltext".into(),
                scopes: None,
                down: true,
            },
        ];
        let orchestrator = build_orchestrator(&config, Collaborators::default()).expect("build");
        let descriptors = orchestrator.registry().descriptors();

        let fulltext = descriptors
            .iter()
            .find(|d| d.id == BackendId::FullText)
            .expect("fulltext");
        assert!(fulltext.marked_down);

        let catalog = descriptors
            .iter()
            .find(|d| d.id == BackendId::Catalog)
            .expect("catalog");
        assert!(catalog.supports(Scope::Bucket));
        assert!(!catalog.supports(Scope::Global));
    }

    #[test]
    fn bad_url_is_config_error() {
        let mut config = config();
        config.catalog = Some(CatalogSection {
            url: "not a url".into(),
        });
        let err = build_orchestrator(&config, Collaborators::default()).expect_err("bad url");
        assert_eq!(err.code(), "CONFIG_INVALID");
    }

    #[test]
    fn empty_config_builds_empty_registry() {
        let orchestrator =
            build_orchestrator(&QuarryConfig::default(), Collaborators::default())
                .expect("build");
        assert!(orchestrator.registry().descriptors().is_empty());
    }
}
