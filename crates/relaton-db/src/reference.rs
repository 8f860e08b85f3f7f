//! Reference normalization.
//!
//! Turns free-text references into the canonical `(prefix, code, year)` form
//! and the cache key derived from it:
//! - `ISO 19115-1` → `ISO(ISO 19115-1)`
//! - `ISO 19133:2005` → `ISO(ISO 19133:2005)`
//! - `CN(GB/T 20223-2006)` → `CN(GB/T 20223:2006)`
//! - `RFC 8341` → `IETF(RFC 8341)`
//! - `ISO 19115 (all parts)` and `ISO 19115` → `ISO(ISO 19115)`, all parts

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{DbError, DbResult};
use crate::resolver::{FetchOptions, ResolverRegistry};

const ALL_PARTS_MARKER: &str = "(all parts)";

/// A normalized standards reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Family prefix of the resolver that claimed the reference.
    pub prefix: String,

    /// Document code without wrapper, year or all-parts marker.
    pub code: String,

    /// Publication year, explicit or embedded.
    pub year: Option<String>,

    /// Whether every part of a multi-part standard is requested.
    pub all_parts: bool,
}

impl Reference {
    /// Normalize a raw reference.
    ///
    /// An explicit `year` overrides a year embedded in `raw` (`CODE:YYYY` or
    /// `CODE-YYYY`). Fails with [`DbError::UnrecognizedPrefix`] when no
    /// registered resolver claims the reference.
    pub fn normalize(
        raw: &str,
        year: Option<&str>,
        opts: &FetchOptions,
        registry: &ResolverRegistry,
    ) -> DbResult<Self> {
        let reference = raw.trim().replace('\u{2013}', "-");

        let resolver = registry
            .find(&reference)
            .ok_or_else(|| DbError::UnrecognizedPrefix {
                reference: raw.to_string(),
                allowed: registry.prefixes().join(", "),
            })?;
        let prefix = resolver.prefix().to_string();

        let (reference, marked) = match strip_all_parts(&reference) {
            Some(stripped) => (stripped, true),
            None => (reference.as_str(), false),
        };
        let (code, embedded_year) = split_year(strip_wrapper(reference, &prefix));
        let year = year
            .map(str::trim)
            .filter(|y| !y.is_empty())
            .map(String::from)
            .or(embedded_year);

        let requested = opts
            .get("all_parts")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let all_parts = requested || marked || !resolver.has_part(&code);

        Ok(Self {
            prefix,
            code,
            year,
            all_parts,
        })
    }

    /// Canonical cache key: `<PREFIX>(<CODE>[:<YEAR>])`.
    pub fn cache_key(&self) -> CacheKey {
        match &self.year {
            Some(year) => CacheKey(format!("{}({}:{})", self.prefix, self.code, year)),
            None => CacheKey(format!("{}({})", self.prefix, self.code)),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(year) = &self.year {
            write!(f, ":{}", year)?;
        }
        if self.all_parts {
            write!(f, " {}", ALL_PARTS_MARKER)?;
        }
        Ok(())
    }
}

/// Storage address of one logical document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an already canonical key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key as stored.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Family prefix (text before the opening parenthesis).
    pub fn family(&self) -> Option<&str> {
        key_family(&self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Family prefix of any stored key, e.g. `ISO` for `ISO(ISO 19115-1)`.
pub(crate) fn key_family(key: &str) -> Option<&str> {
    let open = key.find('(')?;
    let family = key[..open].trim();
    if family.is_empty() || !key.ends_with(')') {
        return None;
    }
    Some(family)
}

/// Code portion of any stored key, or the whole key when it has no family.
pub(crate) fn key_code(key: &str) -> &str {
    match (key_family(key), key.find('(')) {
        (Some(_), Some(open)) => &key[open + 1..key.len() - 1],
        _ => key,
    }
}

/// `PREFIX(CODE)` to `CODE`, only when the wrapper's parentheses enclose the rest.
fn strip_wrapper<'a>(reference: &'a str, prefix: &str) -> &'a str {
    let Some(inner) = reference
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('('))
    else {
        return reference;
    };

    let mut depth = 1_usize;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return if i + 1 == inner.len() {
                        inner[..i].trim()
                    } else {
                        reference
                    };
                }
            }
            _ => {}
        }
    }
    reference
}

fn strip_all_parts(code: &str) -> Option<&str> {
    let split = code.len().checked_sub(ALL_PARTS_MARKER.len())?;
    if !code.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = code.split_at(split);
    tail.eq_ignore_ascii_case(ALL_PARTS_MARKER)
        .then(|| head.trim_end())
}

fn year_pattern() -> &'static Regex {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    YEAR.get_or_init(|| {
        Regex::new(r"^(?P<code>.+?)[:-](?P<year>(?:18|19|20)\d{2})$")
            .expect("year pattern must compile")
    })
}

fn split_year(code: &str) -> (String, Option<String>) {
    match year_pattern().captures(code) {
        Some(caps) => (
            caps["code"].trim_end().to_string(),
            Some(caps["year"].to_string()),
        ),
        None => (code.to_string(), None),
    }
}
