use std::io;

use regex::Error as RegexError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

#[cfg(feature = "service")]
use sqlx::Error as SqlxError;

/// Errors surfaced by the store adapters, configuration loading, and the fatal preconditions of an
/// import run.
///
/// Problems scoped to a single documentation entity are not `DocrefError`s. Those are recorded as
/// [`crate::import::ImportIssue`]s inside the run's report and never abort the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum DocrefError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("Malformed parsed tree: {0}")]
    ParseInput(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("Import precondition failed: {0}")]
    Precondition(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Store error: {0}")]
    Store(String),
}

impl DocrefError {
    /// Fatal errors stop an import before any store write. Everything else is scoped to whatever
    /// operation produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DocrefError::ParseInput(_) | DocrefError::Precondition(_)
        )
    }
}

impl From<toml::de::Error> for DocrefError {
    fn from(src: toml::de::Error) -> DocrefError {
        DocrefError::Config(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for DocrefError {
    fn from(src: toml::ser::Error) -> DocrefError {
        DocrefError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for DocrefError {
    fn from(src: JsonError) -> DocrefError {
        DocrefError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<io::Error> for DocrefError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => DocrefError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => DocrefError::PermissionDenied,
            _ => DocrefError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<RegexError> for DocrefError {
    fn from(x: RegexError) -> Self {
        DocrefError::Serialization(format!("Regex parse failed: {x}"))
    }
}

#[cfg(feature = "service")]
impl From<SqlxError> for DocrefError {
    fn from(db_error: SqlxError) -> Self {
        DocrefError::Store(format!("database error: {db_error:?}"))
    }
}
