use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the store lives and how it is initialised.
///
/// | url examples                     | meaning                          |
/// |----------------------------------|----------------------------------|
/// | `sqlite:irish-tax.db`            | file, created on first use       |
/// | `irish-tax.db`                   | same, bare path                  |
/// | `sqlite::memory:` / `:memory:`   | ephemeral, for tests             |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Passed to the backend unchanged.
    pub url: String,
    /// Directory of `*.sql` seed files run after migrations. When unset the
    /// backend resolves its own default location.
    pub seeds_dir: Option<PathBuf>,
}

impl DbConfig {
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            seeds_dir: None,
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:irish-tax.db".to_string(),
            seeds_dir: None,
        }
    }
}
