//! # docref
//!
//! Reconciles the output of a docblock parser into a persistent, taxonomy-organized reference store.
//!
//! ## Overview
//!
//! A source parser (external to this crate) exports the documentation comments of a codebase as a
//! tree of files, functions, classes, methods and hooks. docref walks that tree and brings a
//! [`DocStore`](store::DocStore) up to date with it:
//!
//! - **Idempotent upserts**: items are keyed by (slug, kind, parent) and only rewritten when their
//!   content changed, so an import can be re-run any number of times
//! - **Classification**: `@since`, `@package`/`@subpackage` (with file-level fallback) and the
//!   source file become taxonomy terms, created at most once per run
//! - **Visibility**: `@ignore` entities are never imported, `@internal` ones only on request, and
//!   hooks that merely point at their documentation elsewhere are skipped
//! - **Hierarchy**: methods hang under their class and hooks under the function or method that
//!   fires them
//! - **Error tolerance**: a failing entity is recorded in the [`ImportReport`](import::ImportReport)
//!   and its siblings are still imported
//!
//! ## Architecture
//!
//! - **[`entity`]**: the parsed tree (`ParsedTree`, `ParsedFile`, `Function`, `Class`, ...)
//! - **[`import`]**: the reconciliation engine (`Importer`, `UpsertEngine`, `Classifier`,
//!   `TermRegistry`, visibility policy)
//! - **[`store`]**: the `DocStore` trait with in-memory and SQLite (`service` feature) backends
//! - **[`properties`]**: item kinds, taxonomies, identities and slug rules
//! - **[`config`]**: `ImporterConfig`, loaded from TOML
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docref::{
//!     config::ImporterConfig,
//!     entity::ParsedTree,
//!     import::{ImportOptions, Importer},
//!     properties::Actor,
//!     store::MemoryStore,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tree = ParsedTree::from_json(&std::fs::read_to_string("phpdoc.json")?)?;
//!     let config = ImporterConfig::load("docref.toml")?;
//!     let options = ImportOptions::from(&config);
//!
//!     let importer = Importer::new(MemoryStore::with_actor(Actor::new("admin")), config);
//!     let report = importer.import(&tree, options).await?;
//!
//!     println!("{report}");
//!     for error in &report.errors {
//!         eprintln!("{error}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **default**: parsed-tree model, import engine, in-memory store
//! - **service**: SQLite store (`sqlx`)
//! - **bin**: the `docref` command-line importer

pub mod config;
pub mod entity;
pub mod error;
pub mod import;
pub mod properties;
pub mod store;
#[cfg(test)]
mod tests;

pub use error::*;
