//! Task and session types
//!
//! Tasks are owned exclusively by the task directory and mutated only in
//! response to inbound server messages. All identities are server-assigned
//! integer ids; ids are stable and never reused.

use serde::{Deserialize, Serialize};

use crate::constants::ROOT_PARENT_ID;
use crate::impl_domain_status_conversions;
use crate::types::taxonomy::{CategoryId, TimeEntry};

/// Server-assigned task identifier.
pub type TaskId = i32;

/// Lifecycle state of a task.
///
/// At most one task is `Active` across the whole tree. The server enforces
/// this; the client does not validate it locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Active,
    Finished,
}

impl_domain_status_conversions!(TaskState {
    Pending => "pending",
    Active => "active",
    Finished => "finished",
});

impl TaskState {
    /// Wire tag for this state.
    pub const fn as_wire(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Active => 1,
            Self::Finished => 2,
        }
    }

    /// Parse a wire tag. Unknown tags yield `None`.
    pub const fn from_wire(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Pending),
            1 => Some(Self::Active),
            2 => Some(Self::Finished),
            _ => None,
        }
    }
}

/// One start/stop interval during which a task was actively worked.
///
/// A session with no stop instant is still running. Instants are millisecond
/// epochs as transmitted by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Start instant, milliseconds since the epoch.
    pub start_ms: i64,
    /// Stop instant, absent while the session is running.
    pub stop_ms: Option<i64>,
    /// Time entries assigned to this session, at most one per category.
    pub entries: Vec<TimeEntry>,
}

impl Session {
    /// Assign an entry, replacing any existing entry for the same category.
    ///
    /// The most recent assignment for a category wins.
    pub fn assign_entry(&mut self, entry: TimeEntry) {
        if let Some(existing) =
            self.entries.iter_mut().find(|e| e.category_id == entry.category_id)
        {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }

    /// The entry assigned for a category, if any.
    pub fn entry_for(&self, category_id: CategoryId) -> Option<&TimeEntry> {
        self.entries.iter().find(|e| e.category_id == category_id)
    }
}

/// A task as mirrored from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Parent task id, `ROOT_PARENT_ID` (0) for top-level tasks.
    pub parent_id: TaskId,
    /// Position among siblings.
    pub index_in_parent: i32,
    pub name: String,
    pub state: TaskState,
    pub locked: bool,
    /// Server-controlled tasks are rendered read-only by the presentation
    /// layer.
    pub server_controlled: bool,
    pub sessions: Vec<Session>,
    /// Task-level time entry assignments, the base of the inheritance walk.
    pub entries: Vec<TimeEntry>,
}

impl Task {
    /// Whether this task sits at the root of the tree.
    pub fn is_root_level(&self) -> bool {
        self.parent_id == ROOT_PARENT_ID
    }

    /// The task-level entry for a category, if directly assigned.
    pub fn entry_for(&self, category_id: CategoryId) -> Option<&TimeEntry> {
        self.entries.iter().find(|e| e.category_id == category_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::taxonomy::TimeEntry;

    fn entry(category_id: i32, code_id: i32) -> TimeEntry {
        TimeEntry { category_id, code_id }
    }

    #[test]
    fn test_state_wire_tags_round_trip() {
        for state in [TaskState::Pending, TaskState::Active, TaskState::Finished] {
            assert_eq!(TaskState::from_wire(state.as_wire()), Some(state));
        }
        assert_eq!(TaskState::from_wire(7), None);
    }

    #[test]
    fn test_latest_assignment_for_category_wins() {
        let mut session = Session { start_ms: 0, stop_ms: None, entries: vec![] };
        session.assign_entry(entry(1, 10));
        session.assign_entry(entry(2, 20));
        session.assign_entry(entry(1, 11));

        assert_eq!(session.entries.len(), 2);
        assert_eq!(session.entry_for(1), Some(&entry(1, 11)));
        assert_eq!(session.entry_for(2), Some(&entry(2, 20)));
    }
}
