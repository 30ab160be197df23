//! Shared test helpers for `tallyarc-core` integration tests.
//!
//! These helpers provide reusable fixtures so the aggregation and taxonomy
//! tests can focus on behaviour instead of boilerplate.

pub mod fixtures;
