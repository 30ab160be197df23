//! Port interfaces for task lookup
//!
//! This trait defines the boundary between the task directory and its
//! consumers (the taxonomy inheritance walk and the aggregation engine), so
//! tests can substitute a fixture in place of the live directory.

use tallyarc_domain::{Task, TaskId};

/// Read access to the task tree.
pub trait TaskLookup {
    /// Get a task by id.
    fn task(&self, id: TaskId) -> Option<&Task>;

    /// Parent id of a task, if the task is known.
    fn parent_of(&self, id: TaskId) -> Option<TaskId> {
        self.task(id).map(|t| t.parent_id)
    }
}
