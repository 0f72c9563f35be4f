//! Settings file for the `irish-tax` command.
//!
//! ```toml
//! [database]
//! url = "sqlite:irish-tax.db"
//! seeds_dir = "seeds"
//!
//! [logging]
//! level = "info"
//! file = "irish-tax.log"
//! ```
//!
//! Every key is optional. Precedence, lowest first: built-in defaults, the
//! file, environment variables, command-line flags.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tax_core::db::DbConfig;
use thiserror::Error;

/// Read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "irish-tax.toml";

/// Overrides `database.url`.
pub const DB_URL_ENV: &str = "IRISH_TAX_DB";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{}': {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DbConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Bare level or full `EnvFilter` directive. `RUST_LOG` wins when set.
    pub level: String,
    /// Log records are appended here as well as written to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `explicit` if given (it must exist), else [`DEFAULT_CONFIG_FILE`]
    /// when present, else the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Applies [`DB_URL_ENV`] from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_database_url(std::env::var(DB_URL_ENV).ok().filter(|url| !url.is_empty()))
    }

    /// Replaces the database url when `url` is set.
    pub fn with_database_url(
        mut self,
        url: Option<String>,
    ) -> Self {
        if let Some(url) = url {
            self.database.url = url;
        }
        self
    }
}
