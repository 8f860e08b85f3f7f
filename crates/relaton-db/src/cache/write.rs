//! Cache write path.

use tracing::debug;

use crate::digest::compute_digest;
use crate::error::{DbError, DbResult};

use super::{io, CacheEntry, CacheMeta, DbCache, EntryStatus};

pub(crate) fn set_impl(cache: &DbCache, key: &str, entry: &CacheEntry) -> DbResult<()> {
    let (meta_path, payload_path) = cache.entry_paths(key);

    if let Some(parent) = meta_path.parent() {
        io::create_dir_impl(parent)?;
    }

    let metadata = match entry {
        CacheEntry::Found {
            payload,
            version,
            fetched,
        } => {
            // Payload first: metadata is the commit marker.
            io::write_atomic_impl(&payload_path, payload)?;
            CacheMeta {
                key: key.to_string(),
                status: EntryStatus::Found,
                version: version.clone(),
                fetched: *fetched,
                digest: Some(compute_digest(payload)),
            }
        }
        CacheEntry::NotFound { version, fetched } => CacheMeta {
            key: key.to_string(),
            status: EntryStatus::NotFound,
            version: version.clone(),
            fetched: *fetched,
            digest: None,
        },
    };

    let meta_json = serde_json::to_string_pretty(&metadata).map_err(|e| DbError::Cache {
        message: format!("failed to serialize metadata: {}", e),
    })?;
    io::write_atomic_impl(&meta_path, &meta_json)?;

    if metadata.status == EntryStatus::NotFound {
        io::remove_optional_impl(&payload_path)?;
    }

    debug!(key, status = ?metadata.status, tier = %cache.dir.display(), "cached entry");
    Ok(())
}
