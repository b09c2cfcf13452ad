//! Typed documentation entities, as produced by the external docblock parser.
//!
//! Everything here is read-only input to the importer. The shapes mirror the parser's JSON export
//! so a [`ParsedTree`] can be decoded directly with [`ParsedTree::from_json`]; fields the importer
//! has no use for are ignored, and absent collections decode as empty.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, slice};

use crate::error::DocrefError;

/// A single `@name content` annotation.
///
/// Fields beyond `name` and `content` (`types`, `variable`, `refers`, ...) are kept verbatim in
/// `extra` so the raw tag list can be stored alongside the item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tag {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Tag {
        Tag {
            name: name.into(),
            content: content.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Docblock {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub long_description: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Docblock {
    /// The first tag carrying `name`. Later duplicates are ignored.
    pub fn first_tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.name == name)
    }

    /// Content of the first tag carrying `name`.
    pub fn tag_content(&self, name: &str) -> Option<&str> {
        self.first_tag(name).map(|tag| tag.content.as_str())
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.first_tag(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_empty() && self.long_description.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(rename = "type", default)]
    pub type_hint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Protected => write!(f, "protected"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    #[default]
    Action,
    Filter,
    ActionReference,
    FilterReference,
    ActionDeprecated,
    FilterDeprecated,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Action => "action",
            HookKind::Filter => "filter",
            HookKind::ActionReference => "action_reference",
            HookKind::FilterReference => "filter_reference",
            HookKind::ActionDeprecated => "action_deprecated",
            HookKind::FilterDeprecated => "filter_deprecated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Hook {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: HookKind,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub doc: Docblock,
}

impl Hook {
    /// Hooks that only point at the place another hook of the same name is documented.
    pub fn is_reference_stub(&self) -> bool {
        const STUB_PREFIXES: [&str; 2] = [
            "This action is documented in",
            "This filter is documented in",
        ];
        self.doc.is_empty()
            || STUB_PREFIXES
                .iter()
                .any(|prefix| self.doc.description.starts_with(prefix))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    #[serde(default)]
    pub doc: Docblock,
    #[serde(default)]
    pub hooks: Vec<Hook>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    #[serde(default)]
    pub doc: Docblock,
    #[serde(default)]
    pub hooks: Vec<Hook>,
    #[serde(rename = "final", default)]
    pub is_final: bool,
    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,
    #[serde(rename = "static", default)]
    pub is_static: bool,
    #[serde(default)]
    pub visibility: Visibility,
}

impl Method {
    /// The stored name of a method always carries its class, `Class::method`.
    pub fn qualified_name(&self, class: &Class) -> String {
        format!("{}::{}", class.name, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(rename = "static", default)]
    pub is_static: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub doc: Docblock,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(rename = "final", default)]
    pub is_final: bool,
    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub implements: Vec<String>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub doc: Docblock,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedFile {
    pub path: String,
    /// The file-level docblock. Its `@package`/`@subpackage` tags are the fallback for every
    /// entity declared in the file.
    #[serde(rename = "file", default)]
    pub doc: Docblock,
    #[serde(default)]
    pub functions: Vec<Function>,
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub hooks: Vec<Hook>,
}

/// The parser's complete output for one import invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedTree(pub Vec<ParsedFile>);

impl ParsedTree {
    pub fn new(files: Vec<ParsedFile>) -> ParsedTree {
        ParsedTree(files)
    }

    /// Decode a parser JSON export.
    pub fn from_json(json: &str) -> Result<ParsedTree, DocrefError> {
        let tree: ParsedTree = serde_json::from_str(json)
            .map_err(|e| DocrefError::ParseInput(format!("could not decode parsed tree: {e}")))?;
        tree.validate()?;
        Ok(tree)
    }

    pub(crate) fn validate(&self) -> Result<(), DocrefError> {
        if let Some(idx) = self.0.iter().position(|file| file.path.trim().is_empty()) {
            return Err(DocrefError::ParseInput(format!(
                "file entry {idx} has no path"
            )));
        }
        Ok(())
    }

    pub fn files(&self) -> slice::Iter<'_, ParsedFile> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge another export into this one, e.g. when a directory of exports is imported in one run.
    pub fn extend(&mut self, other: ParsedTree) {
        self.0.extend(other.0);
    }
}
