//! Time category and time code taxonomy types
//!
//! Categories and codes are identified by server-assigned integer ids.
//! Code id 0 is reserved for the synthetic "Unknown" sentinel, constructed
//! on demand when the inheritance walk finds no assignment; it is never
//! transmitted on the wire.

use serde::{Deserialize, Serialize};

use crate::constants::UNKNOWN_CODE_ID;

/// Server-assigned time category identifier.
pub type CategoryId = i32;

/// Server-assigned time code identifier.
pub type CodeId = i32;

/// A sub-label within a time category (e.g. "PS" under "Project").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCode {
    pub id: CodeId,
    pub name: String,
    /// Archiving is the deletion mechanism; archived codes stay resolvable.
    pub archived: bool,
}

impl TimeCode {
    /// The synthetic sentinel returned when no code is assigned anywhere on
    /// a task's parent chain.
    pub fn unknown() -> Self {
        Self { id: UNKNOWN_CODE_ID, name: "Unknown".to_string(), archived: false }
    }

    /// Whether this is the synthetic sentinel.
    pub fn is_unknown(&self) -> bool {
        self.id == UNKNOWN_CODE_ID
    }
}

/// A labeled bucket for time tracking (e.g. "Project").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCategory {
    pub id: CategoryId,
    pub name: String,
    pub archived: bool,
    /// Codes in server order.
    pub codes: Vec<TimeCode>,
}

impl TimeCategory {
    /// Look up a code of this category by id.
    pub fn code(&self, id: CodeId) -> Option<&TimeCode> {
        self.codes.iter().find(|c| c.id == id)
    }
}

/// A (category, code) pair assigned to a task or session.
///
/// Value type, compared by component equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeEntry {
    pub category_id: CategoryId,
    pub code_id: CodeId,
}

impl TimeEntry {
    pub const fn new(category_id: CategoryId, code_id: CodeId) -> Self {
        Self { category_id, code_id }
    }
}

/// Whether a taxonomy delta entry introduces or revises an item.
///
/// Deletion is not supported; archiving is the deletion mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Add,
    Update,
}

/// One code carried by a taxonomy delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDelta {
    pub change: ChangeKind,
    pub code: TimeCode,
}

/// One category carried by a taxonomy delta, with its changed codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDelta {
    pub change: ChangeKind,
    pub id: CategoryId,
    pub name: String,
    pub archived: bool,
    pub codes: Vec<CodeDelta>,
}

/// An incremental add/update of categories and codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyDelta {
    pub categories: Vec<CategoryDelta>,
}
