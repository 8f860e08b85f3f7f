//! Cache read path.

use std::path::Path;

use tracing::{debug, warn};

use crate::digest::compute_digest;
use crate::error::{DbError, DbResult};

use super::keys::META_EXT;
use super::{io, CacheEntry, CacheMeta, DbCache, EntryStatus};

pub(crate) fn get_metadata_impl(cache: &DbCache, key: &str) -> DbResult<Option<CacheMeta>> {
    let (meta_path, _) = cache.entry_paths(key);
    match read_meta(&meta_path, key)? {
        Some(meta) if meta.key == key => Ok(Some(meta)),
        Some(meta) => {
            debug!(key, stored = %meta.key, "entry path owned by another key");
            Ok(None)
        }
        None => Ok(None),
    }
}

pub(crate) fn get_impl(cache: &DbCache, key: &str) -> DbResult<Option<CacheEntry>> {
    let Some(meta) = get_metadata_impl(cache, key)? else {
        debug!(key, tier = %cache.dir.display(), "entry not in cache");
        return Ok(None);
    };

    let CacheMeta {
        status,
        version,
        fetched,
        digest,
        ..
    } = meta;

    if status == EntryStatus::NotFound {
        return Ok(Some(CacheEntry::NotFound { version, fetched }));
    }

    let (_, payload_path) = cache.entry_paths(key);
    let payload = io::read_optional_impl(&payload_path)?.ok_or_else(|| DbError::CorruptEntry {
        key: key.to_string(),
        message: "payload file missing".to_string(),
    })?;

    if let Some(expected) = digest {
        let actual = compute_digest(&payload);
        if actual != expected {
            warn!(
                key,
                expected = %expected,
                actual = %actual,
                "cache integrity check failed"
            );
            return Err(DbError::IntegrityMismatch {
                key: key.to_string(),
                expected,
                actual,
            });
        }
    }

    Ok(Some(CacheEntry::Found {
        payload,
        version,
        fetched,
    }))
}

pub(crate) fn families_impl(cache: &DbCache) -> DbResult<Vec<String>> {
    Ok(io::sorted_children_impl(&cache.dir)?
        .into_iter()
        .filter(|p| p.is_dir())
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect())
}

/// Metadata of every entry of one family, in stored order.
pub(crate) fn family_metadata_impl(cache: &DbCache, family: &str) -> DbResult<Vec<CacheMeta>> {
    let mut result = Vec::new();
    for path in io::sorted_children_impl(&cache.dir.join(family))? {
        if path.extension().map(|e| e != META_EXT).unwrap_or(true) {
            continue;
        }
        let location = path.display().to_string();
        match read_meta(&path, &location) {
            Ok(Some(meta)) => result.push(meta),
            Ok(None) => {}
            Err(e) if e.is_damaged_entry() => {
                warn!(path = %location, error = %e, "skipping unreadable cache metadata");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(result)
}

pub(crate) fn family_version_impl(cache: &DbCache, family: &str) -> DbResult<Option<String>> {
    Ok(family_metadata_impl(cache, family)?
        .into_iter()
        .next()
        .map(|meta| meta.version))
}

pub(crate) fn all_impl(cache: &DbCache) -> DbResult<Vec<(String, CacheEntry)>> {
    let mut result = Vec::new();

    for family in families_impl(cache)? {
        for meta in family_metadata_impl(cache, &family)? {
            match get_impl(cache, &meta.key) {
                Ok(Some(entry)) => result.push((meta.key, entry)),
                Ok(None) => {}
                Err(e) if e.is_damaged_entry() => {
                    warn!(key = %meta.key, error = %e, "skipping damaged cache entry");
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(result)
}

fn read_meta(path: &Path, key: &str) -> DbResult<Option<CacheMeta>> {
    let Some(content) = io::read_optional_impl(path)? else {
        return Ok(None);
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| DbError::CorruptEntry {
            key: key.to_string(),
            message: format!("failed to parse cache metadata: {}", e),
        })
}

