//! Persistent cache tier.
//!
//! One `DbCache` backs each tier (global, local). Entries carry their
//! resolver schema version and fetch date next to the payload, and payloads
//! are verified against their recorded digest on read.
//!
//! # Cache Structure
//!
//! ```text
//! <tier>/{family}/
//!   {stem}.json   # Entry metadata (key, status, version, fetched, digest)
//!   {stem}.xml    # Serialized record, found entries only
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DbResult;

mod evict;
mod io;
mod keys;
pub(crate) mod policy;
mod read;
mod write;

pub(crate) use keys::family_dir;

/// Whether an entry holds a record or a confirmed negative lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Found,
    NotFound,
}

/// Cache metadata stored alongside the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    /// Full cache key (paths are lossy).
    pub key: String,

    /// Entry kind.
    pub status: EntryStatus,

    /// Resolver schema version at write time.
    pub version: String,

    /// Calendar day of the last (re)fetch.
    pub fetched: NaiveDate,

    /// Payload digest (sha256:...), found entries only.
    #[serde(default)]
    pub digest: Option<String>,
}

/// A cached lookup result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// Serialized record.
    Found {
        payload: String,
        version: String,
        fetched: NaiveDate,
    },

    /// The resolver had nothing for this key on `fetched`.
    NotFound { version: String, fetched: NaiveDate },
}

impl CacheEntry {
    /// Resolver schema version at write time.
    pub fn version(&self) -> &str {
        match self {
            Self::Found { version, .. } | Self::NotFound { version, .. } => version,
        }
    }

    /// Day of the last (re)fetch.
    pub fn fetched(&self) -> NaiveDate {
        match self {
            Self::Found { fetched, .. } | Self::NotFound { fetched, .. } => *fetched,
        }
    }

    /// Serialized record, if any.
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::Found { payload, .. } => Some(payload),
            Self::NotFound { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// One persistent cache tier.
#[derive(Debug, Clone)]
pub struct DbCache {
    dir: PathBuf,
}

impl DbCache {
    /// Open a tier, creating its directory if absent.
    pub fn open(dir: impl Into<PathBuf>) -> DbResult<Self> {
        let dir = dir.into();
        io::create_dir_impl(&dir)?;
        Ok(Self { dir })
    }

    /// Tier directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_paths(&self, key: &str) -> (PathBuf, PathBuf) {
        keys::entry_paths_impl(&self.dir, key)
    }

    /// Raw lookup, no freshness logic.
    ///
    /// Returns `Err` with [`DbError::IntegrityMismatch`](crate::DbError::IntegrityMismatch)
    /// or [`DbError::CorruptEntry`](crate::DbError::CorruptEntry) if the entry is damaged
    /// (caller should delete and re-fetch).
    pub fn get(&self, key: &str) -> DbResult<Option<CacheEntry>> {
        read::get_impl(self, key)
    }

    /// Metadata without loading the payload.
    pub fn metadata(&self, key: &str) -> DbResult<Option<CacheMeta>> {
        read::get_metadata_impl(self, key)
    }

    /// Create or overwrite an entry.
    pub fn set(&self, key: &str, entry: &CacheEntry) -> DbResult<()> {
        write::set_impl(self, key, entry)
    }

    /// Remove an entry; no-op if absent.
    pub fn delete(&self, key: &str) -> DbResult<()> {
        evict::delete_impl(self, key)
    }

    /// Every readable entry, ordered by family then path stem.
    pub fn all(&self) -> DbResult<Vec<(String, CacheEntry)>> {
        read::all_impl(self)
    }

    /// Stored schema version of an entry, whether or not it matches `expected_version`.
    pub fn valid_entry(&self, key: &str, expected_version: &str) -> DbResult<Option<String>> {
        let stored = self.metadata(key)?.map(|meta| meta.version);
        if let Some(version) = &stored {
            tracing::debug!(
                key,
                stored = %version,
                expected = expected_version,
                matches = version == expected_version,
                "checked entry version"
            );
        }
        Ok(stored)
    }

    /// Day the entry was last fetched.
    pub fn fetched(&self, key: &str) -> DbResult<Option<NaiveDate>> {
        Ok(self.metadata(key)?.map(|meta| meta.fetched))
    }

    /// Family directory names present in the tier.
    pub fn families(&self) -> DbResult<Vec<String>> {
        read::families_impl(self)
    }

    /// Version of the first entry of a family in stored order.
    pub fn family_version(&self, family: &str) -> DbResult<Option<String>> {
        read::family_version_impl(self, family)
    }

    /// Delete every entry of a family, returning how many were removed.
    pub fn purge_family(&self, family: &str) -> DbResult<usize> {
        evict::purge_family_impl(self, family)
    }

    /// Remove every entry of the tier.
    pub fn clear(&self) -> DbResult<()> {
        evict::clear_impl(self)
    }
}
