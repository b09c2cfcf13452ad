use std::collections::HashMap;

use crate::{
    error::DocrefError,
    properties::{NewTerm, Taxonomy, TermId, TermRef},
    store::DocStore,
};

type TermKey = (Taxonomy, String, Option<TermId>);

/// Memoizes term resolution for the length of one import run.
///
/// Terms are keyed by (taxonomy, slug, parent), so each distinct term costs at most one store
/// lookup and one create per run. Failures are memoized under their own key only: a rejected
/// label keeps failing for the rest of the run without touching the store again, and every other
/// label resolves normally.
///
/// The registry is not shared between runs or threads. Two concurrent runs against the same store
/// can still race on a create; the store's own uniqueness constraint has to catch that.
#[derive(Debug, Default)]
pub struct TermRegistry {
    resolved: HashMap<TermKey, Result<TermRef, DocrefError>>,
    hits: usize,
}

impl TermRegistry {
    pub fn new() -> TermRegistry {
        TermRegistry::default()
    }

    /// Find or create the term `label` in `taxonomy` under `parent`.
    pub async fn resolve<S: DocStore>(
        &mut self,
        store: &S,
        label: &str,
        taxonomy: Taxonomy,
        parent: Option<TermId>,
    ) -> Result<TermRef, DocrefError> {
        let term = NewTerm::new(label.trim(), taxonomy, parent);
        let key = (taxonomy, term.slug.clone(), parent);
        if let Some(cached) = self.resolved.get(&key) {
            self.hits += 1;
            tracing::debug!("[TermRegistry] cache hit for {taxonomy} term '{label}'");
            return cached.clone();
        }

        let result = if term.slug.is_empty() {
            Err(DocrefError::Store(format!(
                "{taxonomy} term label '{label}' has no usable characters"
            )))
        } else {
            store.find_or_create_term(&term).await
        };
        self.resolved.insert(key, result.clone());
        result
    }

    /// Distinct (taxonomy, slug, parent) keys seen this run.
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Resolutions answered from the memo instead of the store.
    pub fn hits(&self) -> usize {
        self.hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{properties::Actor, store::MemoryStore};
    use test_log::test;

    #[test(tokio::test)]
    async fn test_single_creation_per_key() {
        let store = MemoryStore::with_actor(Actor::new("admin"));
        let mut registry = TermRegistry::new();

        let first = registry
            .resolve(&store, "4.2.0", Taxonomy::SinceVersion, None)
            .await
            .unwrap();
        let second = registry
            .resolve(&store, "4.2.0", Taxonomy::SinceVersion, None)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.stats().terms_created, 1);
        assert_eq!(store.stats().term_lookups, 1);
        assert_eq!(registry.hits(), 1);
    }

    #[test(tokio::test)]
    async fn test_parent_is_part_of_the_key() {
        let store = MemoryStore::new();
        let mut registry = TermRegistry::new();

        let admin = registry
            .resolve(&store, "Administration", Taxonomy::Package, None)
            .await
            .unwrap();
        let top = registry
            .resolve(&store, "Widgets", Taxonomy::Package, None)
            .await
            .unwrap();
        let nested = registry
            .resolve(&store, "Widgets", Taxonomy::Package, Some(admin.id))
            .await
            .unwrap();

        assert_ne!(top.id, nested.id);
        assert_eq!(nested.parent, Some(admin.id));
        assert_eq!(store.stats().terms_created, 3);
        assert_eq!(registry.len(), 3);
    }

    #[test(tokio::test)]
    async fn test_existing_terms_are_reused() {
        let store = MemoryStore::new();
        let existing = store
            .create_term(&NewTerm::new("WordPress", Taxonomy::Package, None))
            .await
            .unwrap();

        let mut registry = TermRegistry::new();
        let resolved = registry
            .resolve(&store, "WordPress", Taxonomy::Package, None)
            .await
            .unwrap();
        assert_eq!(resolved, existing);
        assert_eq!(store.stats().terms_created, 1);
    }

    #[test(tokio::test)]
    async fn test_failures_stay_local() {
        let store = MemoryStore::new();
        store.fail_term("0.71");
        let mut registry = TermRegistry::new();

        assert!(registry
            .resolve(&store, "0.71", Taxonomy::SinceVersion, None)
            .await
            .is_err());
        assert!(registry
            .resolve(&store, "1.2.0", Taxonomy::SinceVersion, None)
            .await
            .is_ok());

        // The failure is memoized: no second lookup reaches the store
        let lookups = store.stats().term_lookups;
        assert!(registry
            .resolve(&store, "0.71", Taxonomy::SinceVersion, None)
            .await
            .is_err());
        assert_eq!(store.stats().term_lookups, lookups);
    }

    #[test(tokio::test)]
    async fn test_unusable_label() {
        let store = MemoryStore::new();
        let mut registry = TermRegistry::new();
        assert!(matches!(
            registry.resolve(&store, " ?! ", Taxonomy::Package, None).await,
            Err(DocrefError::Store(_))
        ));
        assert_eq!(store.stats().term_lookups, 0);
    }
}
