//! Task directory - the client-side mirror of the server's task tree

pub mod ports;
mod service;

pub use self::service::{TaskDirectory, UpsertOutcome};
