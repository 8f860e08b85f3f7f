//! Cache eviction.

use std::fs;

use tracing::debug;

use crate::error::{DbError, DbResult};

use super::keys::META_EXT;
use super::{io, DbCache};

pub(crate) fn delete_impl(cache: &DbCache, key: &str) -> DbResult<()> {
    let (meta_path, payload_path) = cache.entry_paths(key);

    // Metadata first so a half-deleted entry reads as absent.
    let removed = io::remove_optional_impl(&meta_path)?;
    io::remove_optional_impl(&payload_path)?;

    if removed {
        debug!(key, tier = %cache.dir.display(), "evicted from cache");
    }
    Ok(())
}

pub(crate) fn purge_family_impl(cache: &DbCache, family: &str) -> DbResult<usize> {
    let family_path = cache.dir.join(family);

    let count = io::sorted_children_impl(&family_path)?
        .iter()
        .filter(|p| p.extension().map(|e| e == META_EXT).unwrap_or(false))
        .count();

    if family_path.exists() {
        fs::remove_dir_all(&family_path).map_err(|e| DbError::Cache {
            message: format!("failed to purge family {}: {}", family, e),
        })?;
        debug!(family, count, tier = %cache.dir.display(), "purged family");
    }

    Ok(count)
}

pub(crate) fn clear_impl(cache: &DbCache) -> DbResult<()> {
    for path in io::sorted_children_impl(&cache.dir)? {
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| DbError::Cache {
            message: format!("failed to clear cache: {}", e),
        })?;
    }
    debug!(tier = %cache.dir.display(), "cleared cache");
    Ok(())
}
