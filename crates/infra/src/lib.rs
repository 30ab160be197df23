//! # TallyArc Infrastructure
//!
//! Infrastructure layer of the client core.
//!
//! This crate contains:
//! - The length-framed binary wire codec and message registry
//! - The socket client and its blocking connection loop
//! - Configuration loading (environment variables, TOML files)
//! - Telemetry initialization
//!
//! ## Architecture
//! - Depends on `tallyarc-domain` and `tallyarc-core`
//! - Contains all "impure" code (sockets, environment, clocks)

pub mod client;
pub mod config;
pub mod sequence;
pub mod telemetry;
pub mod wire;

// Re-export commonly used items
pub use client::Client;
pub use sequence::RequestSequence;
pub use wire::{Message, ProtocolError};
