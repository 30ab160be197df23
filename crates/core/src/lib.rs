//! # TallyArc Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The task directory (the client-side mirror of the server's task tree)
//! - The time taxonomy with parent-chain inheritance lookup
//! - The incremental report-aggregation engine
//! - The model-change event surface consumed by the presentation layer
//!
//! ## Architecture Principles
//! - Only depends on `tallyarc-domain`
//! - No socket, wire, or platform code
//! - All state is mutated from a single thread (the connection loop in
//!   `tallyarc-infra`); nothing here is internally synchronized

pub mod directory;
pub mod events;
pub mod report;
pub mod taxonomy;

// Re-export specific items to avoid ambiguity
pub use directory::ports::TaskLookup;
pub use directory::{TaskDirectory, UpsertOutcome};
pub use events::ModelEvent;
pub use report::engine::AggregationEngine;
pub use report::tree::{AggregationTree, CategoryNode, TaskNode, TotalNode};
pub use taxonomy::TimeTaxonomy;
