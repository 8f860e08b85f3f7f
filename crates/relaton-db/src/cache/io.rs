//! Filesystem helpers for cache tiers.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{DbError, DbResult};

pub(crate) fn create_dir_impl(dir: &Path) -> DbResult<()> {
    fs::create_dir_all(dir).map_err(|e| DbError::Cache {
        message: format!("failed to create cache directory {}: {}", dir.display(), e),
    })
}

/// Write via a sibling temp file and rename, so readers never see a partial file.
pub(crate) fn write_atomic_impl(path: &Path, content: &str) -> DbResult<()> {
    let temp_path = temp_path(path);

    fs::write(&temp_path, content).map_err(|e| DbError::Cache {
        message: format!("failed to write temp file: {}", e),
    })?;

    fs::rename(&temp_path, path).map_err(|e| DbError::Cache {
        message: format!("failed to rename temp file: {}", e),
    })?;

    Ok(())
}

/// Read a file, mapping "does not exist" to `None`.
pub(crate) fn read_optional_impl(path: &Path) -> DbResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DbError::Cache {
            message: format!("failed to read {}: {}", path.display(), e),
        }),
    }
}

/// Remove a file, treating a missing file as success.
pub(crate) fn remove_optional_impl(path: &Path) -> DbResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DbError::Cache {
            message: format!("failed to remove {}: {}", path.display(), e),
        }),
    }
}

/// Sorted paths of a directory's children; empty when the directory is absent.
pub(crate) fn sorted_children_impl(dir: &Path) -> DbResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(DbError::Cache {
                message: format!("failed to read cache directory {}: {}", dir.display(), e),
            })
        }
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DbError::Cache {
            message: format!("failed to read directory entry: {}", e),
        })?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
