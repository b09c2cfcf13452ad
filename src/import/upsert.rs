//! Create-or-update of a single item.
//!
//! The engine is the only part of the importer that writes item content. For each entity it
//!
//! 1. applies the visibility policy and stops early for skipped entities,
//! 2. builds the candidate [`ItemFields`] (slug from the name, excerpt from the short description,
//!    body from the long description),
//! 3. looks the item up by (slug, kind, parent),
//! 4. creates it when absent, updates it when any field differs, and otherwise leaves it alone.
//!
//! Store failures become an [`UpsertOutcome::Failed`] carrying the issue to record; they never
//! propagate, so the caller can move on to the entity's siblings.

use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;

use crate::{
    entity::{Class, Docblock, Function, Hook, Method},
    error::DocrefError,
    import::{
        visibility::{skip_reason, SkipReason},
        ImportIssue,
    },
    properties::{to_slug, ItemFields, ItemId, ItemKind, ItemStatus, MetaKey},
    store::DocStore,
};

#[derive(Debug, Clone, Copy)]
enum Source<'a> {
    Function(&'a Function),
    Class(&'a Class),
    Method(&'a Method),
    Hook(&'a Hook),
}

/// One entity, as the engine sees it: kind, display name, docblock, and where the metadata comes
/// from.
#[derive(Debug, Clone)]
pub struct ItemDraft<'a> {
    pub kind: ItemKind,
    pub name: Cow<'a, str>,
    pub doc: &'a Docblock,
    source: Source<'a>,
}

impl<'a> ItemDraft<'a> {
    pub fn function(function: &'a Function) -> ItemDraft<'a> {
        ItemDraft {
            kind: ItemKind::Function,
            name: Cow::Borrowed(&function.name),
            doc: &function.doc,
            source: Source::Function(function),
        }
    }

    pub fn class(class: &'a Class) -> ItemDraft<'a> {
        ItemDraft {
            kind: ItemKind::Class,
            name: Cow::Borrowed(&class.name),
            doc: &class.doc,
            source: Source::Class(class),
        }
    }

    /// Methods are stored under their qualified `Class::method` name.
    pub fn method(method: &'a Method, class: &Class) -> ItemDraft<'a> {
        ItemDraft {
            kind: ItemKind::Method,
            name: Cow::Owned(method.qualified_name(class)),
            doc: &method.doc,
            source: Source::Method(method),
        }
    }

    pub fn hook(hook: &'a Hook) -> ItemDraft<'a> {
        ItemDraft {
            kind: ItemKind::Hook,
            name: Cow::Borrowed(&hook.name),
            doc: &hook.doc,
            source: Source::Hook(hook),
        }
    }

    pub fn slug(&self) -> String {
        to_slug(&self.name)
    }

    pub fn fields(&self, parent: Option<ItemId>) -> ItemFields {
        ItemFields {
            kind: self.kind,
            slug: self.slug(),
            title: self.name.to_string(),
            excerpt: self.doc.description.clone(),
            content: self.doc.long_description.clone(),
            parent,
            status: ItemStatus::Publish,
        }
    }

    /// Every metadata value stored with the item: positions, arguments, and the raw tag list for
    /// all kinds, plus the flags particular to classes, methods, and hooks.
    pub fn meta(&self) -> Result<Vec<(MetaKey, Value)>, DocrefError> {
        let (line, end_line) = match self.source {
            Source::Function(f) => (f.line, f.end_line),
            Source::Class(c) => (c.line, c.end_line),
            Source::Method(m) => (m.line, m.end_line),
            Source::Hook(h) => (h.line, h.end_line),
        };
        let mut meta = vec![
            (MetaKey::LineNum, Value::from(line)),
            (MetaKey::EndLineNum, Value::from(end_line)),
            (MetaKey::Tags, to_value(&self.doc.tags)?),
        ];
        match self.source {
            Source::Function(function) => {
                meta.push((MetaKey::Args, to_value(&function.arguments)?));
            }
            Source::Class(class) => {
                meta.push((MetaKey::Final, Value::from(class.is_final)));
                meta.push((MetaKey::Abstract, Value::from(class.is_abstract)));
                meta.push((MetaKey::Extends, to_value(&class.extends)?));
                meta.push((MetaKey::Implements, to_value(&class.implements)?));
                meta.push((MetaKey::Properties, to_value(&class.properties)?));
            }
            Source::Method(method) => {
                meta.push((MetaKey::Args, to_value(&method.arguments)?));
                meta.push((MetaKey::Final, Value::from(method.is_final)));
                meta.push((MetaKey::Abstract, Value::from(method.is_abstract)));
                meta.push((MetaKey::Static, Value::from(method.is_static)));
                meta.push((MetaKey::Visibility, Value::from(method.visibility.to_string())));
            }
            Source::Hook(hook) => {
                meta.push((MetaKey::Args, to_value(&hook.arguments)?));
                meta.push((MetaKey::HookType, Value::from(hook.kind.as_str())));
            }
        }
        Ok(meta)
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, DocrefError> {
    Ok(serde_json::to_value(value)?)
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Created(ItemId),
    Updated(ItemId),
    /// Found with identical content; nothing written.
    Unchanged(ItemId),
    Skipped(SkipReason),
    Failed(ImportIssue),
}

impl UpsertOutcome {
    /// The item's identity when it exists in the store after the upsert. Children of a skipped or
    /// failed entity are imported without a parent.
    pub fn id(&self) -> Option<ItemId> {
        match self {
            UpsertOutcome::Created(id) | UpsertOutcome::Updated(id) | UpsertOutcome::Unchanged(id) => {
                Some(*id)
            }
            UpsertOutcome::Skipped(_) | UpsertOutcome::Failed(_) => None,
        }
    }
}

pub struct UpsertEngine<'s, S> {
    store: &'s S,
    import_internal: bool,
}

impl<'s, S: DocStore> UpsertEngine<'s, S> {
    pub fn new(store: &'s S, import_internal: bool) -> UpsertEngine<'s, S> {
        UpsertEngine {
            store,
            import_internal,
        }
    }

    pub async fn upsert(&self, draft: &ItemDraft<'_>, parent: Option<ItemId>) -> UpsertOutcome {
        if let Some(reason) = skip_reason(draft.doc, self.import_internal) {
            tracing::info!(
                "Skipped importing {} {} \"{}\"",
                reason,
                draft.kind,
                draft.name
            );
            return UpsertOutcome::Skipped(reason);
        }

        let candidate = draft.fields(parent);
        if candidate.slug.is_empty() {
            return UpsertOutcome::Failed(ImportIssue::ItemUpsert {
                kind: draft.kind,
                name: draft.name.to_string(),
                reason: "name has no slug-safe characters".to_string(),
            });
        }
        let outcome = match self.write(&candidate).await {
            Ok(outcome) => outcome,
            Err(e) => {
                return UpsertOutcome::Failed(ImportIssue::ItemUpsert {
                    kind: draft.kind,
                    name: draft.name.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        match &outcome {
            UpsertOutcome::Created(id) => {
                tracing::info!("Imported {} \"{}\" ({id})", draft.kind, draft.name)
            }
            UpsertOutcome::Updated(id) => {
                tracing::info!("Updated {} \"{}\" ({id})", draft.kind, draft.name)
            }
            _ => tracing::debug!("{} \"{}\" is up to date", draft.kind, draft.name),
        }
        outcome
    }

    async fn write(&self, candidate: &ItemFields) -> Result<UpsertOutcome, DocrefError> {
        match self.store.find_item(&candidate.key()).await? {
            Some(existing) if existing.fields == *candidate => {
                Ok(UpsertOutcome::Unchanged(existing.id))
            }
            Some(existing) => {
                let id = self.store.update_item(existing.id, candidate).await?;
                Ok(UpsertOutcome::Updated(id))
            }
            None => {
                let id = self.store.create_item(candidate).await?;
                Ok(UpsertOutcome::Created(id))
            }
        }
    }

    /// Write the draft's metadata to `id`, one value at a time. Returns the values that could not
    /// be written.
    pub async fn write_meta(&self, id: ItemId, draft: &ItemDraft<'_>) -> Vec<ImportIssue> {
        let entries = match draft.meta() {
            Ok(entries) => entries,
            Err(e) => {
                return vec![ImportIssue::Meta {
                    kind: draft.kind,
                    name: draft.name.to_string(),
                    key: MetaKey::Tags,
                    reason: e.to_string(),
                }]
            }
        };
        let mut issues = Vec::new();
        for (key, value) in entries {
            if let Err(e) = self.store.set_item_meta(id, key, &value).await {
                issues.push(ImportIssue::Meta {
                    kind: draft.kind,
                    name: draft.name.to_string(),
                    key,
                    reason: e.to_string(),
                });
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entity::{HookKind, Tag, Visibility},
        properties::Actor,
        store::MemoryStore,
        tests::helpers::{class, function, hook, method},
    };
    use test_log::test;

    #[test(tokio::test)]
    async fn test_create_then_unchanged() {
        let store = MemoryStore::with_actor(Actor::new("admin"));
        let engine = UpsertEngine::new(&store, false);
        let f = function("wp_insert_post", "Insert or update a post.");

        let first = engine.upsert(&ItemDraft::function(&f), None).await;
        let UpsertOutcome::Created(id) = first else {
            panic!("expected a create, got {first:?}");
        };
        let second = engine.upsert(&ItemDraft::function(&f), None).await;
        assert_eq!(second, UpsertOutcome::Unchanged(id));
        assert_eq!(store.stats().items_created, 1);
        assert_eq!(store.stats().items_updated, 0);
    }

    #[test(tokio::test)]
    async fn test_changed_content_updates_in_place() {
        let store = MemoryStore::new();
        let engine = UpsertEngine::new(&store, false);
        let mut f = function("wp_insert_post", "Insert or update a post.");
        let id = engine
            .upsert(&ItemDraft::function(&f), None)
            .await
            .id()
            .unwrap();

        f.doc.long_description = "If the $postarr parameter has 'ID' set...".to_string();
        assert_eq!(
            engine.upsert(&ItemDraft::function(&f), None).await,
            UpsertOutcome::Updated(id)
        );
        let stored = store.item(id).unwrap();
        assert_eq!(stored.fields.content, f.doc.long_description);
        assert_eq!(stored.fields.excerpt, "Insert or update a post.");
        assert_eq!(stored.fields.status, ItemStatus::Publish);
    }

    #[test(tokio::test)]
    async fn test_parent_is_part_of_identity() {
        let store = MemoryStore::new();
        let engine = UpsertEngine::new(&store, false);
        let h = hook("save_post", HookKind::Action, "Fires once a post has been saved.");

        let top = engine.upsert(&ItemDraft::hook(&h), None).await.id().unwrap();
        let nested = engine
            .upsert(&ItemDraft::hook(&h), Some(ItemId(40)))
            .await
            .id()
            .unwrap();
        assert_ne!(top, nested);
        assert_eq!(store.item(nested).unwrap().fields.parent, Some(ItemId(40)));
    }

    #[test(tokio::test)]
    async fn test_skips_never_touch_the_store() {
        let store = MemoryStore::new();
        let mut f = function("_wp_private", "Private helper.");
        f.doc.tags.push(Tag::new("ignore", ""));

        for import_internal in [false, true] {
            let engine = UpsertEngine::new(&store, import_internal);
            assert_eq!(
                engine.upsert(&ItemDraft::function(&f), None).await,
                UpsertOutcome::Skipped(SkipReason::Ignored)
            );
        }
        assert_eq!(store.stats().item_lookups, 0);
    }

    #[test(tokio::test)]
    async fn test_store_failure_is_reported() {
        let store = MemoryStore::new();
        store.fail_item("WP_Widget::form");
        let engine = UpsertEngine::new(&store, false);
        let c = class("WP_Widget", vec![method("form", "Outputs the settings form.")]);

        let outcome = engine
            .upsert(&ItemDraft::method(&c.methods[0], &c), Some(ItemId(1)))
            .await;
        let UpsertOutcome::Failed(issue) = outcome else {
            panic!("expected a failure, got {outcome:?}");
        };
        assert!(issue
            .to_string()
            .starts_with("Problem inserting/updating method \"WP_Widget::form\""));
    }

    #[test(tokio::test)]
    async fn test_unsluggable_name_fails_without_writing() {
        let store = MemoryStore::new();
        let engine = UpsertEngine::new(&store, false);
        let h = hook("{$}", HookKind::Action, "Fires for a dynamic name.");

        let outcome = engine.upsert(&ItemDraft::hook(&h), None).await;
        let UpsertOutcome::Failed(issue) = outcome else {
            panic!("expected a failure, got {outcome:?}");
        };
        assert!(issue.to_string().contains("no slug-safe characters"));
        assert_eq!(store.stats().item_lookups, 0);
        assert!(store.items().is_empty());
    }

    #[test]
    fn test_method_draft_meta() {
        let mut c = class("WP_Widget", vec![method("get_field_id", "Constructs id attributes.")]);
        c.methods[0].visibility = Visibility::Protected;
        c.methods[0].is_static = true;

        let draft = ItemDraft::method(&c.methods[0], &c);
        assert_eq!(draft.name, "WP_Widget::get_field_id");
        assert_eq!(draft.slug(), "wp_widget-get_field_id");

        let meta = draft.meta().unwrap();
        assert!(meta.contains(&(MetaKey::Visibility, Value::from("protected"))));
        assert!(meta.contains(&(MetaKey::Static, Value::from(true))));
        assert!(meta.iter().any(|(key, _)| *key == MetaKey::Args));
        assert!(!meta.iter().any(|(key, _)| *key == MetaKey::Properties));
    }

    #[test]
    fn test_class_draft_has_no_args() {
        let c = class("WP_Query", vec![]);
        let meta = ItemDraft::class(&c).meta().unwrap();
        assert!(!meta.iter().any(|(key, _)| *key == MetaKey::Args));
        assert!(meta.contains(&(MetaKey::Extends, Value::Null)));
    }
}
