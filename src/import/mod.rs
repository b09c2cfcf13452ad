//! The reconciliation engine: walks a [`ParsedTree`](crate::entity::ParsedTree) and upserts every
//! documented entity into a [`DocStore`](crate::store::DocStore).
//!
//! ## Key Components
//!
//! - [`Importer`] - runs an import over a whole parsed tree and returns an [`ImportReport`]
//! - [`visibility`] - the `@ignore` / `@internal` policy
//! - [`TermRegistry`] - per-run memo of resolved classification terms
//! - [`UpsertEngine`] - lookup-then-create-or-update of a single item
//! - [`Classifier`] - `@since`, `@package`/`@subpackage` and source-file term assignment
//!
//! Re-running an import against the same store is safe: items are keyed by (slug, kind, parent),
//! content is only written when it differs, and terms are looked up before they are created.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::{
    config::ImporterConfig,
    properties::{ItemKind, MetaKey, Taxonomy},
};

pub mod classify;
pub mod orchestrator;
pub mod terms;
pub mod upsert;
pub mod visibility;

pub use classify::Classifier;
pub use orchestrator::Importer;
pub use terms::TermRegistry;
pub use upsert::{ItemDraft, UpsertEngine, UpsertOutcome};
pub use visibility::{should_import, SkipReason};

/// Per-run flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Never pause between batches.
    pub skip_throttle: bool,
    /// Import entities tagged `@internal`. `@ignore` is never imported.
    pub import_internal: bool,
}

impl From<&ImporterConfig> for ImportOptions {
    fn from(config: &ImporterConfig) -> Self {
        ImportOptions {
            skip_throttle: config.import.skip_throttle,
            import_internal: config.import.import_internal,
        }
    }
}

/// A problem scoped to one entity or file. Recorded in the [`ImportReport`], never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImportIssue {
    /// The file's source-file term could not be resolved; none of its entities were imported.
    FileTerm {
        path: String,
        slug: String,
        reason: String,
    },
    /// The store rejected the create or update of an item.
    ItemUpsert {
        kind: ItemKind,
        name: String,
        reason: String,
    },
    /// A classification term could not be resolved or attached. The item itself was imported.
    TermResolution {
        kind: ItemKind,
        name: String,
        taxonomy: Taxonomy,
        label: String,
        reason: String,
    },
    /// A metadata value could not be written.
    Meta {
        kind: ItemKind,
        name: String,
        key: MetaKey,
        reason: String,
    },
}

impl Display for ImportIssue {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ImportIssue::FileTerm { path, slug, reason } => write!(
                f,
                "Problem creating file term \"{slug}\" for {path}: {reason}"
            ),
            ImportIssue::ItemUpsert { kind, name, reason } => write!(
                f,
                "Problem inserting/updating {kind} \"{name}\": {reason}"
            ),
            ImportIssue::TermResolution {
                kind,
                name,
                taxonomy,
                label,
                reason,
            } => write!(
                f,
                "Cannot set {taxonomy} term \"{label}\" on {kind} \"{name}\": {reason}"
            ),
            ImportIssue::Meta {
                kind,
                name,
                key,
                reason,
            } => write!(f, "Cannot set {key} meta on {kind} \"{name}\": {reason}"),
        }
    }
}

/// Outcome of one import run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub files: usize,
    pub created: usize,
    pub updated: usize,
    /// Items that already existed with identical content.
    pub unchanged: usize,
    /// Entities left out by policy: `@ignore`, `@internal`, or reference-stub hooks.
    pub skipped: usize,
    /// Item-level failures. Each entry names the entity kind and name.
    pub errors: Vec<String>,
    /// Classification and metadata problems on items that were otherwise imported.
    pub warnings: Vec<String>,
    /// Throttling pauses taken.
    pub pauses: usize,
}

impl ImportReport {
    /// Items that exist in the store after this run, whether written or already current.
    pub fn imported_count(&self) -> usize {
        self.created + self.updated + self.unchanged
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub(crate) fn record(&mut self, outcome: &UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created(_) => self.created += 1,
            UpsertOutcome::Updated(_) => self.updated += 1,
            UpsertOutcome::Unchanged(_) => self.unchanged += 1,
            UpsertOutcome::Skipped(_) => self.skipped += 1,
            UpsertOutcome::Failed(issue) => self.error(issue),
        }
    }

    pub(crate) fn error(&mut self, issue: &ImportIssue) {
        tracing::warn!("{issue}");
        self.errors.push(issue.to_string());
    }

    pub(crate) fn warn(&mut self, issues: Vec<ImportIssue>) {
        for issue in issues {
            tracing::warn!("{issue}");
            self.warnings.push(issue.to_string());
        }
    }
}

impl Display for ImportReport {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} files: {} created, {} updated, {} unchanged, {} skipped, {} errors",
            self.files,
            self.created,
            self.updated,
            self.unchanged,
            self.skipped,
            self.errors.len()
        )
    }
}
