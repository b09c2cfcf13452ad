//! The persistent content store the importer reconciles against.
//!
//! [`DocStore`] is the whole contract the import engine needs: keyed item lookup, create/update,
//! metadata writes, term lookup/creation, term attachment, and the current-actor gate. Each call is
//! its own unit of work; the importer never holds a transaction open across entities.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryStore`] - in-process, always available. Used by tests and dry runs.
//! - `SqliteStore` - `sqlx`-backed, behind the `service` feature.

use serde_json::Value;
use std::future::Future;

use crate::{
    error::DocrefError,
    properties::{Actor, ItemFields, ItemId, ItemKey, MetaKey, NewTerm, StoredItem},
};

pub mod memory;
#[cfg(feature = "service")]
pub mod sqlite;

pub use memory::{MemoryStore, StoreStats};
#[cfg(feature = "service")]
pub use sqlite::SqliteStore;

pub use crate::properties::{Taxonomy, TermId, TermRef};

pub trait DocStore: Sync {
    /// The identity store writes are attributed to. `None` (or an anonymous actor) means the
    /// import must not run.
    fn current_actor(
        &self,
    ) -> impl Future<Output = Result<Option<Actor>, DocrefError>> + Send;

    /// Look up an item by its (slug, kind, parent) identity. `Ok(None)` is "not found", never a
    /// failure.
    fn find_item(
        &self,
        key: &ItemKey,
    ) -> impl Future<Output = Result<Option<StoredItem>, DocrefError>> + Send;

    fn create_item(
        &self,
        fields: &ItemFields,
    ) -> impl Future<Output = Result<ItemId, DocrefError>> + Send;

    fn update_item(
        &self,
        id: ItemId,
        fields: &ItemFields,
    ) -> impl Future<Output = Result<ItemId, DocrefError>> + Send;

    /// Insert or overwrite one metadata value of an item.
    fn set_item_meta(
        &self,
        id: ItemId,
        key: MetaKey,
        value: &Value,
    ) -> impl Future<Output = Result<(), DocrefError>> + Send;

    /// Look up a term by (taxonomy, slug, parent).
    fn find_term(
        &self,
        taxonomy: Taxonomy,
        slug: &str,
        parent: Option<TermId>,
    ) -> impl Future<Output = Result<Option<TermRef>, DocrefError>> + Send;

    fn create_term(
        &self,
        term: &NewTerm,
    ) -> impl Future<Output = Result<TermRef, DocrefError>> + Send;

    /// Replace the item's terms within `taxonomy` by `terms`. Terms of other taxonomies are left
    /// alone, and attaching the same set twice leaves the item unchanged.
    fn attach_terms(
        &self,
        item: ItemId,
        taxonomy: Taxonomy,
        terms: &[TermId],
    ) -> impl Future<Output = Result<(), DocrefError>> + Send;

    /// The terms an item carries within one taxonomy.
    fn item_terms(
        &self,
        item: ItemId,
        taxonomy: Taxonomy,
    ) -> impl Future<Output = Result<Vec<TermRef>, DocrefError>> + Send;

    fn find_or_create_term(
        &self,
        term: &NewTerm,
    ) -> impl Future<Output = Result<TermRef, DocrefError>> + Send {
        async move {
            if let Some(existing) = self
                .find_term(term.taxonomy, &term.slug, term.parent)
                .await?
            {
                tracing::debug!(
                    "[DocStore] found existing {} term '{}' ({})",
                    term.taxonomy,
                    existing.label,
                    existing.id
                );
                return Ok(existing);
            }
            self.create_term(term).await
        }
    }
}
