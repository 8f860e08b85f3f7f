//! Cache locations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult};

/// Where the two cache tiers live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    /// Shared cache, reused across documents.
    #[serde(default = "default_global_cache")]
    pub global_cache: PathBuf,

    /// Per-document working cache.
    #[serde(default = "default_local_cache")]
    pub local_cache: PathBuf,
}

fn default_global_cache() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".relaton")
        .join("cache")
}

fn default_local_cache() -> PathBuf {
    PathBuf::from("relaton").join("cache")
}

fn home_cache_dir() -> DbResult<PathBuf> {
    cache_under(dirs::home_dir())
}

fn cache_under(home: Option<PathBuf>) -> DbResult<PathBuf> {
    let home = home.ok_or_else(|| DbError::Config {
        message: "could not determine home directory; set RELATON_GLOBAL_CACHE".to_string(),
    })?;
    Ok(home.join(".relaton").join("cache"))
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            global_cache: default_global_cache(),
            local_cache: default_local_cache(),
        }
    }
}

impl DbConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `RELATON_GLOBAL_CACHE` | Global tier directory (default: `~/.relaton/cache`) |
    /// | `RELATON_LOCAL_CACHE` | Local tier directory (default: `relaton/cache`) |
    ///
    /// Without `RELATON_GLOBAL_CACHE`, fails with [`DbError::Config`] when the
    /// home directory cannot be determined.
    pub fn from_env() -> DbResult<Self> {
        let global_cache = match env_path("RELATON_GLOBAL_CACHE") {
            Some(path) => path,
            None => home_cache_dir()?,
        };
        Ok(Self {
            global_cache,
            local_cache: env_path("RELATON_LOCAL_CACHE").unwrap_or_else(default_local_cache),
        })
    }

    /// Set the global tier directory.
    pub fn with_global_cache(mut self, dir: impl Into<PathBuf>) -> Self {
        self.global_cache = dir.into();
        self
    }

    /// Set the local tier directory.
    pub fn with_local_cache(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_cache = dir.into();
        self
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
