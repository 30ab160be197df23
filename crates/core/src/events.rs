//! Model-change events delivered to the presentation layer
//!
//! The connection loop is the single producer; the presentation layer
//! consumes from whatever single-threaded context it runs on. Posting is
//! fire-and-forget; the core never blocks on presentation work.

use tallyarc_domain::TaskId;

use crate::report::tree::AggregationTree;

/// A tagged model-change notification.
#[derive(Debug, Clone)]
pub enum ModelEvent {
    /// All tasks were dropped (reconnect).
    Cleared,
    /// A task id previously unknown to the directory was inserted.
    NewTask(TaskId),
    /// A known task's mutable fields were updated.
    UpdatedTask { id: TaskId, parent_changed: bool },
    /// A known task moved to a different parent.
    ReparentTask { id: TaskId, old_parent_id: TaskId },
    /// The server finished replaying the initial configuration; staged
    /// messages have been flushed.
    ConfigurationComplete,
    /// The aggregation tree was reconciled against a new report set.
    ReportUpdated(Box<AggregationTree>),
    /// The server rejected a client-initiated mutation. Display-only; local
    /// state is unaffected.
    ServerFailure { request_id: i32, message: String },
    /// The server acknowledged a client-initiated mutation.
    ServerSuccess,
    /// Opaque bug-tracker integration payload, passed through unparsed.
    BugzillaConfig(Vec<u8>),
    /// The connection loop terminated. No automatic retry; reconnection is
    /// an explicit user action.
    Disconnected,
}
