use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::DocrefError,
    properties::{
        Actor, ItemFields, ItemId, ItemKey, MetaKey, NewTerm, StoredItem, Taxonomy, TermId,
        TermRef,
    },
    store::DocStore,
};

/// Counters for every write and lookup a [`MemoryStore`] has served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub item_lookups: usize,
    pub items_created: usize,
    pub items_updated: usize,
    pub meta_writes: usize,
    pub term_lookups: usize,
    pub terms_created: usize,
    pub term_attachments: usize,
}

type TermIndexKey = (Taxonomy, String, Option<TermId>);

#[derive(Debug, Default)]
struct MemoryState {
    last_item: i64,
    last_term: i64,
    items: BTreeMap<ItemId, ItemFields>,
    item_index: BTreeMap<ItemKey, ItemId>,
    meta: BTreeMap<(ItemId, MetaKey), Value>,
    terms: BTreeMap<TermId, TermRef>,
    term_index: BTreeMap<TermIndexKey, TermId>,
    item_terms: BTreeMap<(ItemId, Taxonomy), BTreeSet<TermId>>,
    failing_items: BTreeSet<String>,
    failing_terms: BTreeSet<String>,
    stats: StoreStats,
}

/// An in-process [`DocStore`].
///
/// Item and term identities are unique-constrained the same way the SQLite store's tables are:
/// creating a second item with an existing (slug, kind, parent) or a second term with an existing
/// (taxonomy, slug, parent) is rejected.
///
/// Writes can be made to fail on purpose with [`MemoryStore::fail_item`] and
/// [`MemoryStore::fail_term`], which is how the importer's error paths are exercised.
#[derive(Debug, Default)]
pub struct MemoryStore {
    actor: Option<Actor>,
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// An empty store with no actor. Imports against it fail their precondition check.
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn with_actor(actor: Actor) -> MemoryStore {
        MemoryStore {
            actor: Some(actor),
            state: RwLock::default(),
        }
    }

    /// Reject creates and updates of items titled `title`.
    pub fn fail_item(&self, title: &str) {
        self.state.write().failing_items.insert(title.to_string());
    }

    /// Reject creation of terms labeled `label`.
    pub fn fail_term(&self, label: &str) {
        self.state.write().failing_terms.insert(label.to_string());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.write();
        state.failing_items.clear();
        state.failing_terms.clear();
    }

    pub fn stats(&self) -> StoreStats {
        self.state.read().stats
    }

    pub fn reset_stats(&self) {
        self.state.write().stats = StoreStats::default();
    }

    pub fn items(&self) -> Vec<StoredItem> {
        self.state
            .read()
            .items
            .iter()
            .map(|(id, fields)| StoredItem {
                id: *id,
                fields: fields.clone(),
            })
            .collect()
    }

    pub fn item(&self, id: ItemId) -> Option<StoredItem> {
        self.state.read().items.get(&id).map(|fields| StoredItem {
            id,
            fields: fields.clone(),
        })
    }

    /// The first item (lowest id) carrying `title`.
    pub fn item_by_title(&self, title: &str) -> Option<StoredItem> {
        self.items()
            .into_iter()
            .find(|item| item.fields.title == title)
    }

    pub fn meta(&self, id: ItemId, key: MetaKey) -> Option<Value> {
        self.state.read().meta.get(&(id, key)).cloned()
    }

    pub fn terms(&self, taxonomy: Taxonomy) -> Vec<TermRef> {
        self.state
            .read()
            .terms
            .values()
            .filter(|term| term.taxonomy == taxonomy)
            .cloned()
            .collect()
    }

    /// Synchronous form of [`DocStore::item_terms`].
    pub fn terms_of(&self, item: ItemId, taxonomy: Taxonomy) -> Vec<TermRef> {
        let state = self.state.read();
        state
            .item_terms
            .get(&(item, taxonomy))
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.terms.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl DocStore for MemoryStore {
    async fn current_actor(&self) -> Result<Option<Actor>, DocrefError> {
        Ok(self.actor.clone())
    }

    async fn find_item(&self, key: &ItemKey) -> Result<Option<StoredItem>, DocrefError> {
        let mut state = self.state.write();
        state.stats.item_lookups += 1;
        Ok(state.item_index.get(key).and_then(|id| {
            state.items.get(id).map(|fields| StoredItem {
                id: *id,
                fields: fields.clone(),
            })
        }))
    }

    async fn create_item(&self, fields: &ItemFields) -> Result<ItemId, DocrefError> {
        let mut state = self.state.write();
        if state.failing_items.contains(&fields.title) {
            return Err(DocrefError::Store(format!(
                "refused to create {} '{}'",
                fields.kind, fields.title
            )));
        }
        let key = fields.key();
        if state.item_index.contains_key(&key) {
            return Err(DocrefError::Store(format!(
                "duplicate {} item '{}' under parent {:?}",
                key.kind, key.slug, key.parent
            )));
        }
        state.last_item += 1;
        let id = ItemId(state.last_item);
        state.items.insert(id, fields.clone());
        state.item_index.insert(key, id);
        state.stats.items_created += 1;
        Ok(id)
    }

    async fn update_item(&self, id: ItemId, fields: &ItemFields) -> Result<ItemId, DocrefError> {
        let mut state = self.state.write();
        if state.failing_items.contains(&fields.title) {
            return Err(DocrefError::Store(format!(
                "refused to update {} '{}'",
                fields.kind, fields.title
            )));
        }
        let Some(previous) = state.items.get(&id).cloned() else {
            return Err(DocrefError::NotFound(format!("item {id}")));
        };
        let key = fields.key();
        if let Some(other) = state.item_index.get(&key).filter(|other| **other != id) {
            return Err(DocrefError::Store(format!(
                "update of item {id} collides with item {other}"
            )));
        }
        state.item_index.remove(&previous.key());
        state.item_index.insert(key, id);
        state.items.insert(id, fields.clone());
        state.stats.items_updated += 1;
        Ok(id)
    }

    async fn set_item_meta(
        &self,
        id: ItemId,
        key: MetaKey,
        value: &Value,
    ) -> Result<(), DocrefError> {
        let mut state = self.state.write();
        if !state.items.contains_key(&id) {
            return Err(DocrefError::NotFound(format!("item {id}")));
        }
        state.meta.insert((id, key), value.clone());
        state.stats.meta_writes += 1;
        Ok(())
    }

    async fn find_term(
        &self,
        taxonomy: Taxonomy,
        slug: &str,
        parent: Option<TermId>,
    ) -> Result<Option<TermRef>, DocrefError> {
        let mut state = self.state.write();
        state.stats.term_lookups += 1;
        Ok(state
            .term_index
            .get(&(taxonomy, slug.to_string(), parent))
            .and_then(|id| state.terms.get(id).cloned()))
    }

    async fn create_term(&self, term: &NewTerm) -> Result<TermRef, DocrefError> {
        let mut state = self.state.write();
        if state.failing_terms.contains(&term.label) {
            return Err(DocrefError::Store(format!(
                "refused to create {} term '{}'",
                term.taxonomy, term.label
            )));
        }
        if let Some(parent) = term.parent {
            match state.terms.get(&parent) {
                Some(parent_term) if parent_term.taxonomy == term.taxonomy => {}
                _ => {
                    return Err(DocrefError::Store(format!(
                        "parent term {parent} is not a {} term",
                        term.taxonomy
                    )))
                }
            }
        }
        let index_key = (term.taxonomy, term.slug.clone(), term.parent);
        if state.term_index.contains_key(&index_key) {
            return Err(DocrefError::Store(format!(
                "duplicate {} term '{}'",
                term.taxonomy, term.slug
            )));
        }
        state.last_term += 1;
        let created = TermRef {
            id: TermId(state.last_term),
            taxonomy: term.taxonomy,
            label: term.label.clone(),
            slug: term.slug.clone(),
            parent: term.parent,
        };
        state.terms.insert(created.id, created.clone());
        state.term_index.insert(index_key, created.id);
        state.stats.terms_created += 1;
        Ok(created)
    }

    async fn attach_terms(
        &self,
        item: ItemId,
        taxonomy: Taxonomy,
        terms: &[TermId],
    ) -> Result<(), DocrefError> {
        let mut state = self.state.write();
        if !state.items.contains_key(&item) {
            return Err(DocrefError::NotFound(format!("item {item}")));
        }
        if let Some(stray) = terms.iter().find(|id| {
            state
                .terms
                .get(*id)
                .is_none_or(|term| term.taxonomy != taxonomy)
        }) {
            return Err(DocrefError::Store(format!(
                "term {stray} is not a {taxonomy} term"
            )));
        }
        state
            .item_terms
            .insert((item, taxonomy), terms.iter().copied().collect());
        state.stats.term_attachments += 1;
        Ok(())
    }

    async fn item_terms(
        &self,
        item: ItemId,
        taxonomy: Taxonomy,
    ) -> Result<Vec<TermRef>, DocrefError> {
        Ok(self.terms_of(item, taxonomy))
    }
}
