//! Task directory service
//!
//! Tasks are owned exclusively by this directory and change only in response
//! to inbound server messages. Client-initiated mutations never touch local
//! state directly; they are sent to the server and applied when echoed back.

use std::collections::HashMap;

use tallyarc_domain::{Task, TaskId, TaskState};
use tracing::debug;

use super::ports::TaskLookup;

/// Result of applying an inbound task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The id was unknown; the task was inserted.
    New,
    /// The id was known; mutable fields were updated in place.
    Updated {
        parent_changed: bool,
        old_parent_id: TaskId,
    },
}

/// In-memory mapping of task id to task record.
#[derive(Debug, Default)]
pub struct TaskDirectory {
    tasks: HashMap<TaskId, Task>,
}

impl TaskDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an inbound task record, inserting or updating.
    pub fn upsert(&mut self, task: Task) -> UpsertOutcome {
        match self.tasks.get_mut(&task.id) {
            Some(existing) => {
                let old_parent_id = existing.parent_id;
                let parent_changed = old_parent_id != task.parent_id;
                if parent_changed {
                    debug!(
                        task_id = task.id,
                        old_parent_id,
                        new_parent_id = task.parent_id,
                        "task reparented"
                    );
                }
                *existing = task;
                UpsertOutcome::Updated { parent_changed, old_parent_id }
            }
            None => {
                self.tasks.insert(task.id, task);
                UpsertOutcome::New
            }
        }
    }

    /// Drop all tasks. Used on reconnect before replaying configuration.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// The currently active task, if any.
    ///
    /// The server guarantees at most one task is active across the whole
    /// tree; this is not validated locally.
    pub fn active_task_id(&self) -> Option<TaskId> {
        self.tasks.values().find(|t| t.state == TaskState::Active).map(|t| t.id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All tasks, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }
}

impl TaskLookup for TaskDirectory {
    fn task(&self, id: TaskId) -> Option<&Task> {
        self.get(id)
    }
}

#[cfg(test)]
mod tests {
    use tallyarc_domain::constants::ROOT_PARENT_ID;

    use super::*;

    fn create_test_task(id: TaskId, parent_id: TaskId, state: TaskState) -> Task {
        Task {
            id,
            parent_id,
            index_in_parent: 0,
            name: format!("task {id}"),
            state,
            locked: false,
            server_controlled: false,
            sessions: vec![],
            entries: vec![],
        }
    }

    #[test]
    fn test_upsert_unknown_id_inserts() {
        let mut directory = TaskDirectory::new();
        let outcome = directory.upsert(create_test_task(5, ROOT_PARENT_ID, TaskState::Pending));

        assert_eq!(outcome, UpsertOutcome::New);
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.get(5).map(|t| t.id), Some(5));
    }

    #[test]
    fn test_upsert_known_id_updates_in_place() {
        let mut directory = TaskDirectory::new();
        directory.upsert(create_test_task(5, ROOT_PARENT_ID, TaskState::Pending));

        let mut updated = create_test_task(5, ROOT_PARENT_ID, TaskState::Pending);
        updated.name = "renamed".to_string();
        let outcome = directory.upsert(updated);

        assert_eq!(
            outcome,
            UpsertOutcome::Updated { parent_changed: false, old_parent_id: ROOT_PARENT_ID }
        );
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.get(5).map(|t| t.name.as_str()), Some("renamed"));
    }

    #[test]
    fn test_upsert_reports_parent_change() {
        let mut directory = TaskDirectory::new();
        directory.upsert(create_test_task(5, ROOT_PARENT_ID, TaskState::Pending));
        directory.upsert(create_test_task(7, 5, TaskState::Pending));

        let outcome = directory.upsert(create_test_task(7, ROOT_PARENT_ID, TaskState::Pending));

        assert_eq!(outcome, UpsertOutcome::Updated { parent_changed: true, old_parent_id: 5 });
        assert_eq!(directory.parent_of(7), Some(ROOT_PARENT_ID));
    }

    #[test]
    fn test_active_task_lookup() {
        let mut directory = TaskDirectory::new();
        directory.upsert(create_test_task(1, ROOT_PARENT_ID, TaskState::Pending));
        assert_eq!(directory.active_task_id(), None);

        directory.upsert(create_test_task(2, ROOT_PARENT_ID, TaskState::Active));
        assert_eq!(directory.active_task_id(), Some(2));
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut directory = TaskDirectory::new();
        directory.upsert(create_test_task(1, ROOT_PARENT_ID, TaskState::Pending));
        directory.upsert(create_test_task(2, 1, TaskState::Finished));

        directory.clear();

        assert!(directory.is_empty());
        assert_eq!(directory.get(1), None);
    }
}
