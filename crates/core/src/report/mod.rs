//! Report aggregation - the incremental category/task rollup engine

pub mod engine;
pub mod tree;

pub use self::engine::AggregationEngine;
pub use self::tree::{AggregationTree, CategoryNode, TaskNode, TotalNode};
