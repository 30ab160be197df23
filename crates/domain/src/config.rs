//! Client configuration structures
//!
//! Loaded by the infra layer from environment variables or a config file;
//! see `tallyarc-infra::config::loader`.

use serde::{Deserialize, Serialize};

/// Connection settings for the task server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub server: ServerConfig,
    /// `tracing` filter directive, e.g. `"info"` or `"tallyarc_core=debug"`.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig { host: "localhost".to_string(), port: 6061 },
            log_filter: default_log_filter(),
        }
    }
}
