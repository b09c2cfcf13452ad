use std::time::Duration;

use crate::{
    config::ImporterConfig,
    entity::{Class, Docblock, Function, Hook, ParsedFile, ParsedTree},
    error::DocrefError,
    import::{
        Classifier, ImportIssue, ImportOptions, ImportReport, ItemDraft, SkipReason,
        TermRegistry, UpsertEngine, UpsertOutcome,
    },
    properties::{ItemId, Taxonomy, TermRef},
    store::DocStore,
};

/// Drives a full import of a [`ParsedTree`] into a [`DocStore`].
///
/// Files are walked depth-first in input order: functions and their hooks, then classes, their
/// methods and the methods' hooks, then file-scoped hooks. Parent ids flow down to children; a
/// child whose parent was skipped or failed is imported without a parent.
///
/// The walk is strictly sequential. Term resolution and item upserts are lookup-then-write, so
/// two runs must not share a store concurrently unless the store enforces uniqueness itself.
pub struct Importer<S> {
    store: S,
    config: ImporterConfig,
}

impl<S: DocStore> Importer<S> {
    pub fn new(store: S, config: ImporterConfig) -> Importer<S> {
        Importer { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Import every file in `tree`.
    ///
    /// Fails before touching the store when the tree is malformed or the store has no
    /// authenticated actor. Every other problem is scoped to a file or an entity and is recorded
    /// in the returned report.
    pub async fn import(
        &self,
        tree: &ParsedTree,
        options: ImportOptions,
    ) -> Result<ImportReport, DocrefError> {
        tree.validate()?;
        match self.store.current_actor().await? {
            Some(actor) if !actor.is_anonymous() => {
                tracing::info!(
                    "[Importer] importing {} files as '{}'",
                    tree.len(),
                    actor.login
                );
            }
            _ => {
                return Err(DocrefError::Precondition(
                    "Please specify a valid user".to_string(),
                ))
            }
        }

        let mut run = ImportRun {
            store: &self.store,
            terms: TermRegistry::new(),
            report: ImportReport::default(),
            options,
            throttle: Throttle::new(&self.config, options),
        };
        for file in tree.files() {
            run.import_file(file).await;
        }

        tracing::info!(
            "[Importer] {} ({} term lookups answered from cache)",
            run.report,
            run.terms.hits()
        );
        Ok(run.report)
    }
}

/// Pauses between batches of one collection within a file.
#[derive(Debug, Clone, Copy)]
struct Throttle {
    batch_size: usize,
    pause: Duration,
}

impl Throttle {
    fn new(config: &ImporterConfig, options: ImportOptions) -> Throttle {
        let batch_size = if options.skip_throttle {
            0
        } else {
            config.throttle.batch_size
        };
        Throttle {
            batch_size,
            pause: config.throttle.pause(),
        }
    }

    /// Called after the `processed`th entity of a collection.
    async fn after(&self, processed: usize, report: &mut ImportReport) {
        if self.batch_size == 0 || processed % self.batch_size != 0 {
            return;
        }
        report.pauses += 1;
        if !self.pause.is_zero() {
            tracing::debug!("[Importer] pausing {:?} after {processed} entities", self.pause);
            tokio::time::sleep(self.pause).await;
        }
    }
}

/// The file currently being imported: its docblock for package fallback and its source-file term.
struct FileContext<'f> {
    doc: &'f Docblock,
    term: TermRef,
}

struct ImportRun<'s, S> {
    store: &'s S,
    terms: TermRegistry,
    report: ImportReport,
    options: ImportOptions,
    throttle: Throttle,
}

impl<S: DocStore> ImportRun<'_, S> {
    #[tracing::instrument(skip_all, fields(path = %file.path))]
    async fn import_file(&mut self, file: &ParsedFile) {
        let term = match self
            .terms
            .resolve(self.store, &file.path, Taxonomy::SourceFile, None)
            .await
        {
            Ok(term) => term,
            Err(e) => {
                self.report.error(&ImportIssue::FileTerm {
                    path: file.path.clone(),
                    slug: Taxonomy::SourceFile.slug_for(&file.path),
                    reason: e.to_string(),
                });
                return;
            }
        };
        self.report.files += 1;
        let ctx = FileContext {
            doc: &file.doc,
            term,
        };

        for (idx, function) in file.functions.iter().enumerate() {
            self.import_function(&ctx, function).await;
            self.throttle.after(idx + 1, &mut self.report).await;
        }
        for (idx, class) in file.classes.iter().enumerate() {
            self.import_class(&ctx, class).await;
            self.throttle.after(idx + 1, &mut self.report).await;
        }
        for (idx, hook) in file.hooks.iter().enumerate() {
            self.import_hook(&ctx, hook, None).await;
            self.throttle.after(idx + 1, &mut self.report).await;
        }
    }

    async fn import_function(&mut self, ctx: &FileContext<'_>, function: &Function) {
        let id = self
            .import_item(ctx, &ItemDraft::function(function), None)
            .await;
        for hook in &function.hooks {
            self.import_hook(ctx, hook, id).await;
        }
    }

    async fn import_class(&mut self, ctx: &FileContext<'_>, class: &Class) {
        let class_id = self.import_item(ctx, &ItemDraft::class(class), None).await;
        for method in &class.methods {
            let method_id = self
                .import_item(ctx, &ItemDraft::method(method, class), class_id)
                .await;
            for hook in &method.hooks {
                self.import_hook(ctx, hook, method_id).await;
            }
        }
    }

    async fn import_hook(&mut self, ctx: &FileContext<'_>, hook: &Hook, parent: Option<ItemId>) {
        if hook.is_reference_stub() {
            tracing::debug!("Skipped importing reference stub hook \"{}\"", hook.name);
            self.report
                .record(&UpsertOutcome::Skipped(SkipReason::ReferenceStub));
            return;
        }
        self.import_item(ctx, &ItemDraft::hook(hook), parent).await;
    }

    /// Upsert one entity, then classify it and write its metadata. Returns the id children should
    /// use as their parent.
    async fn import_item(
        &mut self,
        ctx: &FileContext<'_>,
        draft: &ItemDraft<'_>,
        parent: Option<ItemId>,
    ) -> Option<ItemId> {
        let engine = UpsertEngine::new(self.store, self.options.import_internal);
        let outcome = engine.upsert(draft, parent).await;
        self.report.record(&outcome);
        let id = outcome.id()?;

        let mut classifier = Classifier::new(self.store, &mut self.terms);
        let mut issues = classifier.assign_since(id, draft).await;
        issues.extend(classifier.assign_package(id, draft, ctx.doc).await);
        issues.extend(classifier.assign_file(id, draft, &ctx.term).await);
        issues.extend(engine.write_meta(id, draft).await);
        self.report.warn(issues);
        Some(id)
    }
}
