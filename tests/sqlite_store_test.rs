//! SQLite store tests
//!
//! The same import run against `SqliteStore` must give the same shape as against the in-memory
//! store, survive re-opening the database, and be enforced by the table constraints.

#![cfg(feature = "service")]

use serde_json::Value;
use tempfile::tempdir;
use test_log::test;

use docref::{
    config::ImporterConfig,
    import::{ImportOptions, Importer},
    properties::{
        to_slug, Actor, ItemFields, ItemKind, ItemStatus, MetaKey, NewTerm, Taxonomy,
    },
    store::{DocStore, SqliteStore},
    DocrefError,
};

mod common;
use common::widgets_tree;

const QUICK: ImportOptions = ImportOptions {
    skip_throttle: true,
    import_internal: false,
};

fn fields(title: &str, kind: ItemKind) -> ItemFields {
    ItemFields {
        kind,
        slug: to_slug(title),
        title: title.to_string(),
        excerpt: "Summary.".to_string(),
        content: String::new(),
        parent: None,
        status: ItemStatus::Publish,
    }
}

#[test(tokio::test)]
async fn test_import_and_reimport() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("reference.db");

    let store = SqliteStore::open(&db)
        .await
        .unwrap()
        .with_actor(Actor::new("admin"));
    let importer = Importer::new(store, ImporterConfig::default());
    let report = importer.import(&widgets_tree(), QUICK).await.unwrap();
    assert_eq!(report.created, 5);
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    drop(importer);

    // A fresh connection sees everything and changes nothing
    let store = SqliteStore::open(&db)
        .await
        .unwrap()
        .with_actor(Actor::new("admin"));
    let importer = Importer::new(store, ImporterConfig::default());
    let report = importer.import(&widgets_tree(), QUICK).await.unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(report.unchanged, 5);

    let store = importer.store();
    assert_eq!(store.item_count().await.unwrap(), 5);

    let class = store
        .find_item(&fields("WP_Widget", ItemKind::Class).key())
        .await
        .unwrap()
        .unwrap();
    let mut method_key = fields("WP_Widget::display_callback", ItemKind::Method).key();
    method_key.parent = Some(class.id);
    let method = store.find_item(&method_key).await.unwrap().unwrap();
    assert_eq!(method.fields.parent, Some(class.id));

    let packages: Vec<String> = store
        .item_terms(class.id, Taxonomy::Package)
        .await
        .unwrap()
        .into_iter()
        .map(|term| term.label)
        .collect();
    assert_eq!(packages, vec!["WordPress", "Widgets"]);
    assert_eq!(
        store.meta(method.id, MetaKey::Visibility).await.unwrap(),
        Some(Value::from("public"))
    );
}

#[test(tokio::test)]
async fn test_unique_constraints() {
    let dir = tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("reference.db")).await.unwrap();

    let class = fields("WP_Query", ItemKind::Class);
    let id = store.create_item(&class).await.unwrap();
    assert!(matches!(
        store.create_item(&class).await,
        Err(DocrefError::Store(_))
    ));
    // Same slug as another kind is a different item
    store
        .create_item(&fields("WP_Query", ItemKind::Function))
        .await
        .unwrap();

    let mut changed = class.clone();
    changed.content = "The WordPress Query class.".to_string();
    assert_eq!(store.update_item(id, &changed).await.unwrap(), id);
    assert_eq!(
        store.find_item(&class.key()).await.unwrap().unwrap().fields,
        changed
    );

    let term = NewTerm::new("Query", Taxonomy::Package, None);
    store.create_term(&term).await.unwrap();
    assert!(store.create_term(&term).await.is_err());
    assert_eq!(store.find_or_create_term(&term).await.unwrap().label, "Query");
}

#[test(tokio::test)]
async fn test_attach_replaces_within_taxonomy() {
    let dir = tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("reference.db")).await.unwrap();
    let id = store
        .create_item(&fields("get_posts", ItemKind::Function))
        .await
        .unwrap();

    let post = store
        .create_term(&NewTerm::new("Post", Taxonomy::Package, None))
        .await
        .unwrap();
    let query = store
        .create_term(&NewTerm::new("Query", Taxonomy::Package, Some(post.id)))
        .await
        .unwrap();
    let since = store
        .create_term(&NewTerm::new("1.2.0", Taxonomy::SinceVersion, None))
        .await
        .unwrap();

    store
        .attach_terms(id, Taxonomy::SinceVersion, &[since.id])
        .await
        .unwrap();
    store
        .attach_terms(id, Taxonomy::Package, &[post.id, query.id])
        .await
        .unwrap();
    store
        .attach_terms(id, Taxonomy::Package, &[query.id])
        .await
        .unwrap();

    assert_eq!(
        store.item_terms(id, Taxonomy::Package).await.unwrap(),
        vec![query]
    );
    assert_eq!(
        store.item_terms(id, Taxonomy::SinceVersion).await.unwrap(),
        vec![since.clone()]
    );
    assert!(store
        .attach_terms(id, Taxonomy::Package, &[since.id])
        .await
        .is_err());
}
