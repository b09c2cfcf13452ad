//! [crate::properties] contains the store-side building blocks: item and taxonomy kinds,
//! identities, and the slug rules that key items and terms across runs.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::error::DocrefError;

static NON_SLUG_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\W+").expect("static slug pattern compiles"));

/// Turn a display name into a key-safe slug.
///
/// Accents on ASCII letters are folded, the result is lowercased, and every run of non-word
/// characters becomes a single `-`. Leading and trailing dashes are trimmed, so
/// `WP_Query::get_posts` becomes `wp_query-get_posts`. Letters and digits of any script are kept,
/// so names written without ASCII letters still get distinct slugs.
pub fn to_slug(name: &str) -> String {
    let mut decomposed = String::with_capacity(name.len());
    let mut after_ascii = false;
    for c in name.trim().nfd() {
        if is_combining_mark(c) {
            if after_ascii {
                continue;
            }
        } else {
            after_ascii = c.is_ascii();
        }
        decomposed.push(c);
    }
    let folded = decomposed.nfc().collect::<String>().to_lowercase();
    NON_SLUG_RUN
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string()
}

/// Slug of a source-file term. Directory separators are folded into `_` first so
/// `wp-includes/post.php` and `wp-includes-post.php` never share a term.
pub fn file_slug(path: &str) -> String {
    to_slug(&path.replace(['/', '\\'], "_"))
}

/// The kind of an imported item. Every item in the store has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Function,
    Class,
    Method,
    Hook,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Function => "function",
            ItemKind::Class => "class",
            ItemKind::Method => "method",
            ItemKind::Hook => "hook",
        }
    }
}

impl Display for ItemKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = DocrefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "function" => Ok(ItemKind::Function),
            "class" => Ok(ItemKind::Class),
            "method" => Ok(ItemKind::Method),
            "hook" => Ok(ItemKind::Hook),
            other => Err(DocrefError::Serialization(format!(
                "unknown item kind '{other}'"
            ))),
        }
    }
}

/// A classification axis. Only [`Taxonomy::Package`] is hierarchical (package -> subpackage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Taxonomy {
    SourceFile,
    SinceVersion,
    Package,
}

impl Taxonomy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Taxonomy::SourceFile => "source-file",
            Taxonomy::SinceVersion => "since-version",
            Taxonomy::Package => "package",
        }
    }

    /// The slug a label is stored under within this taxonomy.
    pub fn slug_for(&self, label: &str) -> String {
        match self {
            Taxonomy::SourceFile => file_slug(label),
            Taxonomy::SinceVersion | Taxonomy::Package => to_slug(label),
        }
    }
}

impl Display for Taxonomy {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Taxonomy {
    type Err = DocrefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source-file" => Ok(Taxonomy::SourceFile),
            "since-version" => Ok(Taxonomy::SinceVersion),
            "package" => Ok(Taxonomy::Package),
            other => Err(DocrefError::Serialization(format!(
                "unknown taxonomy '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub i64);

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TermId(pub i64);

impl Display for TermId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Publish,
    Draft,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Publish => "publish",
            ItemStatus::Draft => "draft",
        }
    }
}

impl FromStr for ItemStatus {
    type Err = DocrefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publish" => Ok(ItemStatus::Publish),
            "draft" => Ok(ItemStatus::Draft),
            other => Err(DocrefError::Serialization(format!(
                "unknown item status '{other}'"
            ))),
        }
    }
}

/// The identity an item is looked up by: (slug, kind, parent).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub slug: String,
    pub kind: ItemKind,
    pub parent: Option<ItemId>,
}

/// Content fields of an item. Two imports of an unchanged entity produce equal `ItemFields`,
/// which is what lets the upsert skip the write.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemFields {
    pub kind: ItemKind,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub parent: Option<ItemId>,
    pub status: ItemStatus,
}

impl ItemFields {
    pub fn key(&self) -> ItemKey {
        ItemKey {
            slug: self.slug.clone(),
            kind: self.kind,
            parent: self.parent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: ItemId,
    pub fields: ItemFields,
}

/// A term as the store knows it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TermRef {
    pub id: TermId,
    pub taxonomy: Taxonomy,
    pub label: String,
    pub slug: String,
    pub parent: Option<TermId>,
}

/// A term the store has been asked to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTerm {
    pub taxonomy: Taxonomy,
    pub label: String,
    pub slug: String,
    pub parent: Option<TermId>,
}

impl NewTerm {
    pub fn new(label: &str, taxonomy: Taxonomy, parent: Option<TermId>) -> NewTerm {
        NewTerm {
            taxonomy,
            label: label.to_string(),
            slug: taxonomy.slug_for(label),
            parent,
        }
    }
}

/// Per-item metadata keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaKey {
    Args,
    LineNum,
    EndLineNum,
    Tags,
    Final,
    Abstract,
    Static,
    Visibility,
    Extends,
    Implements,
    Properties,
    HookType,
}

impl MetaKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaKey::Args => "args",
            MetaKey::LineNum => "line_num",
            MetaKey::EndLineNum => "end_line_num",
            MetaKey::Tags => "tags",
            MetaKey::Final => "final",
            MetaKey::Abstract => "abstract",
            MetaKey::Static => "static",
            MetaKey::Visibility => "visibility",
            MetaKey::Extends => "extends",
            MetaKey::Implements => "implements",
            MetaKey::Properties => "properties",
            MetaKey::HookType => "hook_type",
        }
    }
}

impl Display for MetaKey {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MetaKey {
    type Err = DocrefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            MetaKey::Args,
            MetaKey::LineNum,
            MetaKey::EndLineNum,
            MetaKey::Tags,
            MetaKey::Final,
            MetaKey::Abstract,
            MetaKey::Static,
            MetaKey::Visibility,
            MetaKey::Extends,
            MetaKey::Implements,
            MetaKey::Properties,
            MetaKey::HookType,
        ]
        .into_iter()
        .find(|key| key.as_str() == s)
        .ok_or_else(|| DocrefError::Serialization(format!("unknown meta key '{s}'")))
    }
}

/// The identity an import runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub login: String,
}

impl Actor {
    pub fn new(login: impl Into<String>) -> Actor {
        Actor {
            login: login.into(),
        }
    }

    /// Anonymous actors carry an empty login and may not import.
    pub fn is_anonymous(&self) -> bool {
        self.login.trim().is_empty()
    }
}
