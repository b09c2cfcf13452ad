//! Shared builders for parsed-tree test fixtures

use crate::entity::{Class, Docblock, Function, Hook, HookKind, Method, ParsedFile, Tag};

/// Initialize logging for tests
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn doc(description: &str) -> Docblock {
    Docblock {
        description: description.to_string(),
        ..Default::default()
    }
}

pub fn file(path: &str) -> ParsedFile {
    ParsedFile {
        path: path.to_string(),
        ..Default::default()
    }
}

pub fn function(name: &str, description: &str) -> Function {
    Function {
        name: name.to_string(),
        line: 1,
        end_line: 2,
        doc: doc(description),
        ..Default::default()
    }
}

/// A class documented as "`name` class." holding `methods`
pub fn class(name: &str, methods: Vec<Method>) -> Class {
    Class {
        name: name.to_string(),
        line: 1,
        end_line: 100,
        methods,
        doc: doc(&format!("{name} class.")),
        ..Default::default()
    }
}

pub fn method(name: &str, description: &str) -> Method {
    Method {
        name: name.to_string(),
        line: 10,
        end_line: 20,
        doc: doc(description),
        ..Default::default()
    }
}

pub fn hook(name: &str, kind: HookKind, description: &str) -> Hook {
    Hook {
        name: name.to_string(),
        kind,
        line: 15,
        end_line: 15,
        doc: doc(description),
        ..Default::default()
    }
}

/// Append `(name, content)` tags to a function's docblock, in order
pub fn tagged(mut function: Function, tags: &[(&str, &str)]) -> Function {
    function
        .doc
        .tags
        .extend(tags.iter().map(|(name, content)| Tag::new(*name, *content)));
    function
}
