//! Key to path derivation.
//!
//! Layout: `<tier>/<family>/<stem>.json` plus `<stem>.xml` for found entries.

use std::path::{Path, PathBuf};

use crate::digest::key_fingerprint;
use crate::reference::{key_code, key_family};

/// Directory used for keys without a family prefix.
pub(crate) const NO_FAMILY_DIR: &str = "_";

const MAX_STEM_LEN: usize = 64;

pub(crate) const META_EXT: &str = "json";
pub(crate) const PAYLOAD_EXT: &str = "xml";

/// On-disk directory name of a family.
pub(crate) fn family_dir(family: Option<&str>) -> String {
    match family.map(|f| slug(f, MAX_STEM_LEN)) {
        Some(dir) if dir != NO_FAMILY_DIR => dir,
        _ => NO_FAMILY_DIR.to_string(),
    }
}

/// Readable, collision-free file stem of a key.
pub(crate) fn entry_stem(key: &str) -> String {
    format!("{}-{}", slug(key_code(key), MAX_STEM_LEN), key_fingerprint(key))
}

pub(crate) fn entry_paths_impl(cache_dir: &Path, key: &str) -> (PathBuf, PathBuf) {
    let dir = cache_dir.join(family_dir(key_family(key)));
    let stem = entry_stem(key);
    (
        dir.join(format!("{}.{}", stem, META_EXT)),
        dir.join(format!("{}.{}", stem, PAYLOAD_EXT)),
    )
}

fn slug(text: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        let c = if c.is_ascii_alphanumeric() || c == '.' {
            c
        } else {
            '_'
        };
        if c == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        out.push(c);
        if out.len() >= max_len {
            break;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str(NO_FAMILY_DIR);
    }
    out
}
