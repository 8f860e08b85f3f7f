//! Resolver capability and the prefix-keyed registry.
//!
//! Every standards body (ISO, NIST, IETF, ...) is served by one [`Resolver`].
//! The cache engine only ever talks to resolvers through this trait and picks
//! one by matching the leading prefix of a reference:
//!
//! 1. Registered prefix followed by a word boundary (`ISO 19115`, `ISO/AWI 24229`,
//!    `CN(GB/T 20223)`)
//! 2. The resolver's default prefix pattern (`RFC 8341` for IETF)
//!
//! Resolvers are tried in registration order.

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;

use crate::cache::family_dir;
use crate::error::ResolverError;
use crate::item::BibliographicItem;
use crate::reference::Reference;

/// Free-form options forwarded to resolvers (e.g. `all_parts`).
pub type FetchOptions = BTreeMap<String, String>;

/// Fetches and (de)serializes documents of one standards family.
pub trait Resolver: Send + Sync {
    /// Family prefix used in cache keys (e.g. `ISO`, `CN`, `IETF`).
    fn prefix(&self) -> &str;

    /// Additional pattern claiming references that do not start with the prefix.
    fn default_prefix(&self) -> Option<&Regex> {
        None
    }

    /// Whether `code` (already stripped of wrapper and year) names a single part.
    ///
    /// Codes without a part are dispatched as `(all parts)` requests. The
    /// default treats a trailing `-<digits>` as a part number (`ISO 19115-1`).
    fn has_part(&self, code: &str) -> bool {
        code.rsplit_once('-')
            .map(|(_, part)| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
    }

    /// Fingerprint of the serialization grammar; see [`grammar_hash`](crate::grammar_hash).
    fn schema_version(&self) -> &str;

    /// Look the reference up at the source.
    ///
    /// `Ok(None)` means the source answered but has no such document.
    fn fetch(
        &self,
        reference: &Reference,
        opts: &FetchOptions,
    ) -> Result<Option<Box<dyn BibliographicItem>>, ResolverError>;

    /// Render a record produced by this resolver.
    fn serialize(&self, item: &dyn BibliographicItem) -> Result<String, ResolverError>;

    /// Rebuild a record from its serialized form.
    fn deserialize(&self, payload: &str) -> Result<Box<dyn BibliographicItem>, ResolverError>;
}

/// Registered resolvers, in lookup order.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    resolvers: Vec<Arc<dyn Resolver>>,
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("prefixes", &self.prefixes())
            .finish()
    }
}

impl ResolverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resolver.
    pub fn register(&mut self, resolver: impl Resolver + 'static) -> &mut Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    /// Add a resolver (builder form).
    pub fn with(mut self, resolver: impl Resolver + 'static) -> Self {
        self.register(resolver);
        self
    }

    /// Find the resolver claiming a raw reference.
    pub fn find(&self, reference: &str) -> Option<&Arc<dyn Resolver>> {
        self.resolvers.iter().find(|r| claims(r.as_ref(), reference))
    }

    /// Look a resolver up by its prefix, ignoring case.
    pub fn by_prefix(&self, prefix: &str) -> Option<&Arc<dyn Resolver>> {
        self.resolvers
            .iter()
            .find(|r| r.prefix().eq_ignore_ascii_case(prefix))
    }

    /// Look a resolver up by the on-disk family directory name.
    pub(crate) fn by_family(&self, family: &str) -> Option<&Arc<dyn Resolver>> {
        self.resolvers
            .iter()
            .find(|r| family_dir(Some(r.prefix())) == family)
    }

    /// Registered prefixes, in lookup order.
    pub fn prefixes(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.prefix()).collect()
    }

    /// Number of registered resolvers.
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Whether no resolver is registered.
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

fn claims(resolver: &dyn Resolver, reference: &str) -> bool {
    if let Some(rest) = reference.strip_prefix(resolver.prefix()) {
        if rest
            .chars()
            .next()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true)
        {
            return true;
        }
    }
    resolver
        .default_prefix()
        .map(|re| re.is_match(reference))
        .unwrap_or(false)
}
