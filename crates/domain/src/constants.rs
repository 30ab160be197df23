//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! client core.

use crate::types::task::TaskId;
use crate::types::taxonomy::CodeId;

// Identity constants
/// Parent id of top-level tasks.
pub const ROOT_PARENT_ID: TaskId = 0;
/// Reserved id of the synthetic "Unknown" time code. Never transmitted.
pub const UNKNOWN_CODE_ID: CodeId = 0;

// Report constants
/// A weekly report carries exactly this many daily slots.
pub const DAYS_PER_WEEK: usize = 7;
/// Milliseconds per whole minute; durations truncate to this unit.
pub const MS_PER_MINUTE: i64 = 60_000;

// Wire constants
/// Bytes occupied by the frame length prefix plus the type tag.
pub const FRAME_HEADER_LEN: usize = 8;
/// Upper bound on a single frame. Lengths beyond this are treated as a
/// corrupt stream rather than an allocation request.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;
