//! Which documented entities are imported at all.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::entity::Docblock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Tagged `@ignore`. Never imported.
    Ignored,
    /// Tagged `@internal` and the run does not import internals.
    Internal,
    /// A hook that only points at where it is documented.
    ReferenceStub,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            SkipReason::Ignored => write!(f, "@ignore"),
            SkipReason::Internal => write!(f, "@internal"),
            SkipReason::ReferenceStub => write!(f, "reference stub"),
        }
    }
}

/// Why `doc` keeps its entity out of the store, if it does.
pub fn skip_reason(doc: &Docblock, import_internal: bool) -> Option<SkipReason> {
    if doc.has_tag("ignore") {
        Some(SkipReason::Ignored)
    } else if !import_internal && doc.has_tag("internal") {
        Some(SkipReason::Internal)
    } else {
        None
    }
}

pub fn should_import(doc: &Docblock, import_internal: bool) -> bool {
    skip_reason(doc, import_internal).is_none()
}
