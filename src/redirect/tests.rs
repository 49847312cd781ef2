//! Tests for redirect module

use super::*;
use crate::entity::{EntityKey, Page, PageFragment, Registry};
use crate::error::{Error, Result};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Loader over a fixed site: title -> redirect target (None for regular pages)
struct SiteLoader {
    registry: Arc<Registry>,
    site: HashMap<String, Option<String>>,
    loads: AtomicUsize,
}

impl SiteLoader {
    fn new(registry: Arc<Registry>, links: &[(&str, Option<&str>)]) -> Self {
        Self {
            registry,
            site: links
                .iter()
                .map(|(from, to)| (from.to_string(), to.map(str::to_string)))
                .collect(),
            loads: AtomicUsize::new(0),
        }
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageLoader for SiteLoader {
    async fn load(&self, page: &Page) -> Result<Page> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let title = page
            .title()
            .ok_or_else(|| Error::invalid_request("page has no title"))?;
        let fragment = match self.site.get(&title) {
            Some(target) => PageFragment {
                title: Some(title.clone()),
                exists: Some(true),
                is_redirect: Some(target.is_some()),
                redirect_target: target.clone().map(EntityKey::by_title),
                ..PageFragment::default()
            },
            None => PageFragment {
                title: Some(title.clone()),
                exists: Some(false),
                is_redirect: Some(false),
                ..PageFragment::default()
            },
        };
        self.registry.merge(page, &fragment)
    }
}

struct FailingLoader;

#[async_trait]
impl PageLoader for FailingLoader {
    async fn load(&self, _page: &Page) -> Result<Page> {
        Err(Error::http_status(502, "bad gateway"))
    }
}

fn foo_chain() -> Vec<(&'static str, Option<&'static str>)> {
    vec![
        ("Foo", Some("Foo2")),
        ("Foo2", Some("Foo23")),
        ("Foo23", Some("Foo24")),
        ("Foo24", None),
    ]
}

fn titles(path: &RedirectPath) -> Vec<String> {
    path.titles()
}

// ============================================================================
// Resolution Tests
// ============================================================================

#[tokio::test]
async fn test_resolve_chain_to_terminal_page() {
    let registry = Arc::new(Registry::new());
    let loader = SiteLoader::new(Arc::clone(&registry), &foo_chain());
    let start = registry.resolve(&EntityKey::by_title("Foo")).unwrap();

    let resolution = RedirectResolver::default()
        .resolve(&loader, &registry, &start)
        .await
        .unwrap();

    assert_eq!(resolution.target.title().as_deref(), Some("Foo24"));
    assert_eq!(titles(&resolution.path), vec!["Foo", "Foo2", "Foo23"]);
    assert!(!resolution.is_direct());
    assert_eq!(loader.loads(), 4);

    // The target is the registry's canonical page
    let foo24 = registry.resolve(&EntityKey::by_title("Foo24")).unwrap();
    assert!(resolution.target.same(&foo24));
}

#[tokio::test]
async fn test_resolve_uses_known_redirects_without_loading() {
    let registry = Arc::new(Registry::new());
    for (from, to) in foo_chain() {
        registry
            .ingest(&PageFragment {
                title: Some(from.into()),
                exists: Some(true),
                is_redirect: Some(to.is_some()),
                redirect_target: to.map(EntityKey::by_title),
                ..PageFragment::default()
            })
            .unwrap();
    }
    let loader = SiteLoader::new(Arc::clone(&registry), &[]);
    let start = registry.resolve(&EntityKey::by_title("Foo")).unwrap();

    let resolution = RedirectResolver::default()
        .resolve(&loader, &registry, &start)
        .await
        .unwrap();

    assert_eq!(titles(&resolution.path), vec!["Foo", "Foo2", "Foo23"]);
    assert_eq!(loader.loads(), 0);
}

#[tokio::test]
async fn test_resolve_non_redirect_is_direct() {
    let registry = Arc::new(Registry::new());
    let loader = SiteLoader::new(Arc::clone(&registry), &[("Plain", None)]);
    let start = registry.resolve(&EntityKey::by_title("Plain")).unwrap();

    let resolution = RedirectResolver::default()
        .resolve(&loader, &registry, &start)
        .await
        .unwrap();

    assert!(resolution.is_direct());
    assert!(resolution.target.same(&start));
}

#[tokio::test]
async fn test_resolve_to_missing_page() {
    let registry = Arc::new(Registry::new());
    let loader = SiteLoader::new(Arc::clone(&registry), &[("Dangling", Some("Nowhere"))]);
    let start = registry.resolve(&EntityKey::by_title("Dangling")).unwrap();

    let resolution = RedirectResolver::default()
        .resolve(&loader, &registry, &start)
        .await
        .unwrap();

    assert_eq!(resolution.target.title().as_deref(), Some("Nowhere"));
    assert_eq!(resolution.target.exists(), Some(false));
}

// ============================================================================
// Cycle & Limit Tests
// ============================================================================

#[tokio::test]
async fn test_resolve_detects_cycle() {
    let registry = Arc::new(Registry::new());
    let loader = SiteLoader::new(
        Arc::clone(&registry),
        &[("A", Some("B")), ("B", Some("C")), ("C", Some("A"))],
    );
    let start = registry.resolve(&EntityKey::by_title("A")).unwrap();

    let err = RedirectResolver::default()
        .resolve(&loader, &registry, &start)
        .await
        .unwrap_err();

    match err {
        Error::CircularRedirect { path } => assert_eq!(path, vec!["A", "B", "C", "A"]),
        other => panic!("expected circular redirect, got {other}"),
    }
    assert_eq!(loader.loads(), 3);
}

#[tokio::test]
async fn test_resolve_detects_self_redirect() {
    let registry = Arc::new(Registry::new());
    let loader = SiteLoader::new(Arc::clone(&registry), &[("Loop", Some("Loop"))]);
    let start = registry.resolve(&EntityKey::by_title("Loop")).unwrap();

    let err = RedirectResolver::default()
        .resolve(&loader, &registry, &start)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CircularRedirect { .. }));
}

#[tokio::test]
async fn test_resolve_detects_cycle_through_title_variants() {
    let registry = Arc::new(Registry::new());
    let loader = SiteLoader::new(
        Arc::clone(&registry),
        &[("Alpha", Some("beta")), ("Beta", Some("alpha_"))],
    );
    let start = registry.resolve(&EntityKey::by_title("Alpha")).unwrap();

    let err = RedirectResolver::default()
        .resolve(&loader, &registry, &start)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CircularRedirect { .. }));
}

#[tokio::test]
async fn test_resolve_enforces_step_limit() {
    let registry = Arc::new(Registry::new());
    let loader = SiteLoader::new(Arc::clone(&registry), &foo_chain());
    let start = registry.resolve(&EntityKey::by_title("Foo")).unwrap();

    let err = RedirectResolver::new(2)
        .resolve(&loader, &registry, &start)
        .await
        .unwrap_err();
    match err {
        Error::StepLimitExceeded { limit, path } => {
            assert_eq!(limit, 2);
            assert_eq!(path, vec!["Foo", "Foo2", "Foo23"]);
        }
        other => panic!("expected step limit, got {other}"),
    }

    // Exactly enough steps succeeds
    let start = registry.resolve(&EntityKey::by_title("Foo")).unwrap();
    let resolution = RedirectResolver::new(3)
        .resolve(&loader, &registry, &start)
        .await
        .unwrap();
    assert_eq!(resolution.path.len(), 3);
}

#[tokio::test]
async fn test_resolve_long_cycle_terminates_at_limit() {
    // 50-page ring: the step limit fires before the cycle closes
    let names: Vec<String> = (0..50).map(|i| format!("Ring {i}")).collect();
    let links: Vec<(&str, Option<&str>)> = names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), Some(names[(i + 1) % 50].as_str())))
        .collect();
    let registry = Arc::new(Registry::new());
    let loader = SiteLoader::new(Arc::clone(&registry), &links);
    let start = registry.resolve(&EntityKey::by_title("Ring 0")).unwrap();

    let err = RedirectResolver::default()
        .resolve(&loader, &registry, &start)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StepLimitExceeded { limit: 20, .. }));
    assert_eq!(loader.loads(), 21);
}

// ============================================================================
// Failure Tests
// ============================================================================

#[tokio::test]
async fn test_resolve_propagates_loader_failure() {
    let registry = Registry::new();
    let start = registry.resolve(&EntityKey::by_title("Foo")).unwrap();

    let err = RedirectResolver::default()
        .resolve(&FailingLoader, &registry, &start)
        .await
        .unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_redirect_with_unknown_target_is_reloaded() {
    let registry = Arc::new(Registry::new());
    let start = registry
        .ingest(&PageFragment {
            title: Some("Opaque".into()),
            is_redirect: Some(true),
            ..PageFragment::default()
        })
        .unwrap();
    let loader = SiteLoader::new(Arc::clone(&registry), &[]);

    let resolution = RedirectResolver::default()
        .resolve(&loader, &registry, &start)
        .await
        .unwrap();

    assert_eq!(loader.loads(), 1);
    assert!(resolution.is_direct());
    assert_eq!(resolution.target.exists(), Some(false));
}

#[test]
fn test_redirect_path_display() {
    let mut path = RedirectPath::new();
    path.push(EntityKey::by_title("A"));
    path.push(EntityKey::by_id(7));
    assert_eq!(path.to_string(), "A -> #7");
    assert_eq!(path.len(), 2);
}
