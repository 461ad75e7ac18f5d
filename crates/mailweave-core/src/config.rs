//! Store configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

fn default_database_path() -> String {
    "mailweave.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

fn default_message_id_domain() -> String {
    "mailweave.local".to_string()
}

/// Configuration for the storage engine, loadable from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Domain component of generated message identifiers.
    #[serde(default = "default_message_id_domain")]
    pub message_id_domain: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_connections: default_max_connections(),
            message_id_domain: default_message_id_domain(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
