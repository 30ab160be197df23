//! Request id sequence
//!
//! A process-scoped generator injected into whatever issues client-initiated
//! requests. Initialized once at connection setup; ids correlate failure
//! responses back to the mutation that caused them.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// Monotonically increasing request id source, cheap to clone and share.
#[derive(Debug, Clone)]
pub struct RequestSequence {
    next: Arc<AtomicI32>,
}

impl Default for RequestSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestSequence {
    /// Start a fresh sequence at 1.
    pub fn new() -> Self {
        Self { next: Arc::new(AtomicI32::new(1)) }
    }

    /// Hand out the next id.
    pub fn next_id(&self) -> i32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
