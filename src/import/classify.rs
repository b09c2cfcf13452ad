use crate::{
    entity::Docblock,
    import::{ImportIssue, ItemDraft, TermRegistry},
    properties::{ItemId, Taxonomy, TermId, TermRef},
    store::DocStore,
};

/// Attaches classification terms to upserted items.
///
/// Each `assign_*` call replaces the item's terms within one taxonomy and leaves every other
/// taxonomy alone, so repeated runs converge on the same term set. Problems are returned as
/// [`ImportIssue::TermResolution`] values; the item stays imported either way.
pub struct Classifier<'a, S> {
    store: &'a S,
    terms: &'a mut TermRegistry,
}

impl<'a, S: DocStore> Classifier<'a, S> {
    pub fn new(store: &'a S, terms: &'a mut TermRegistry) -> Classifier<'a, S> {
        Classifier { store, terms }
    }

    /// Attach the first `@since` version. An item without one has its since-version terms
    /// cleared, so a tag dropped between runs does not leave its old version attached.
    pub async fn assign_since(&mut self, id: ItemId, draft: &ItemDraft<'_>) -> Vec<ImportIssue> {
        let mut issues = Vec::new();
        let version = draft
            .doc
            .tag_content("since")
            .map(str::trim)
            .filter(|version| !version.is_empty());
        let Some(version) = version else {
            self.attach(id, draft, Taxonomy::SinceVersion, &[], &mut issues)
                .await;
            return issues;
        };

        match self
            .terms
            .resolve(self.store, version, Taxonomy::SinceVersion, None)
            .await
        {
            Ok(term) => {
                self.attach(id, draft, Taxonomy::SinceVersion, &[term], &mut issues)
                    .await
            }
            Err(e) => issues.push(issue(draft, Taxonomy::SinceVersion, version, e)),
        }
        issues
    }

    /// Attach `@package` and `@subpackage`, each falling back to the file docblock on its own.
    ///
    /// The subpackage is parented under the package term only when the package resolved in this
    /// same call. Otherwise it becomes a top-level package term.
    pub async fn assign_package(
        &mut self,
        id: ItemId,
        draft: &ItemDraft<'_>,
        file_doc: &Docblock,
    ) -> Vec<ImportIssue> {
        let main = inherited_tag(draft.doc, file_doc, "package");
        let sub = inherited_tag(draft.doc, file_doc, "subpackage");
        let mut issues: Vec<ImportIssue> = ["package", "subpackage"]
            .into_iter()
            .filter(|name| has_empty_tag(draft.doc, name))
            .map(|name| ImportIssue::TermResolution {
                kind: draft.kind,
                name: draft.name.to_string(),
                taxonomy: Taxonomy::Package,
                label: String::new(),
                reason: format!("empty @{name} tag, the file's @{name} is not used"),
            })
            .collect();
        let mut resolved: Vec<TermRef> = Vec::new();

        let mut main_id: Option<TermId> = None;
        if let Some(label) = main {
            match self
                .terms
                .resolve(self.store, label, Taxonomy::Package, None)
                .await
            {
                Ok(term) => {
                    main_id = Some(term.id);
                    resolved.push(term);
                }
                Err(e) => issues.push(issue(draft, Taxonomy::Package, label, e)),
            }
        }
        if let Some(label) = sub {
            match self
                .terms
                .resolve(self.store, label, Taxonomy::Package, main_id)
                .await
            {
                Ok(term) => resolved.push(term),
                Err(e) => issues.push(issue(draft, Taxonomy::Package, label, e)),
            }
        }

        if !resolved.is_empty() {
            self.attach(id, draft, Taxonomy::Package, &resolved, &mut issues)
                .await;
        }
        issues
    }

    /// Attach the term of the file the item was declared in.
    pub async fn assign_file(
        &mut self,
        id: ItemId,
        draft: &ItemDraft<'_>,
        file_term: &TermRef,
    ) -> Vec<ImportIssue> {
        let mut issues = Vec::new();
        self.attach(
            id,
            draft,
            Taxonomy::SourceFile,
            std::slice::from_ref(file_term),
            &mut issues,
        )
        .await;
        issues
    }

    async fn attach(
        &self,
        id: ItemId,
        draft: &ItemDraft<'_>,
        taxonomy: Taxonomy,
        terms: &[TermRef],
        issues: &mut Vec<ImportIssue>,
    ) {
        let ids: Vec<TermId> = terms.iter().map(|term| term.id).collect();
        if let Err(e) = self.store.attach_terms(id, taxonomy, &ids).await {
            let labels = terms
                .iter()
                .map(|term| term.label.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            issues.push(issue(draft, taxonomy, &labels, e));
        }
    }
}

/// True when the docblock's first `name` tag is present but blank. Such a tag still shadows the
/// file's tag in [`inherited_tag`].
fn has_empty_tag(doc: &Docblock, name: &str) -> bool {
    doc.tag_content(name)
        .is_some_and(|content| content.trim().is_empty())
}

/// The item's own tag content, or the file's when the item has none.
fn inherited_tag<'d>(own: &'d Docblock, file: &'d Docblock, name: &str) -> Option<&'d str> {
    own.tag_content(name)
        .or_else(|| file.tag_content(name))
        .map(str::trim)
        .filter(|label| !label.is_empty())
}

fn issue(
    draft: &ItemDraft<'_>,
    taxonomy: Taxonomy,
    label: &str,
    e: crate::error::DocrefError,
) -> ImportIssue {
    ImportIssue::TermResolution {
        kind: draft.kind,
        name: draft.name.to_string(),
        taxonomy,
        label: label.to_string(),
        reason: e.to_string(),
    }
}
