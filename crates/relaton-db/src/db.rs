//! Cache engine.
//!
//! Resolves references through two cache tiers before falling back to the
//! family resolver:
//! 1. Local tier (per-document working set, overrides global)
//! 2. Global tier (shared fallback)
//! 3. Resolver fetch, written through to global then local
//!
//! Not-found answers are cached too, but only trusted on the day they were
//! recorded. Entries written under an older resolver schema are purged when
//! the engine is constructed.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{family_dir, policy, CacheEntry, DbCache};
use crate::clock::{Clock, SystemClock};
use crate::config::DbConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{DbError, DbResult};
use crate::item::BibliographicItem;
use crate::reference::{key_family, CacheKey, Reference};
use crate::resolver::{FetchOptions, Resolver, ResolverRegistry};

/// One of the two cache tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Global,
    Local,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Bibliographic cache engine.
pub struct Db {
    global: DbCache,
    local: DbCache,
    registry: Arc<ResolverRegistry>,
    clock: Arc<dyn Clock>,
    diagnostics: Diagnostics,
}

impl fmt::Debug for Db {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("global", &self.global.dir())
            .field("local", &self.local.dir())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Db {
    /// Open both tiers (creating them if absent) and reconcile schema versions.
    pub fn new(
        global_cache: impl AsRef<Path>,
        local_cache: impl AsRef<Path>,
        registry: Arc<ResolverRegistry>,
    ) -> DbResult<Self> {
        let global = DbCache::open(global_cache.as_ref())?;
        let local = DbCache::open(local_cache.as_ref())?;

        let db = Self {
            global,
            local,
            registry,
            clock: Arc::new(SystemClock),
            diagnostics: Diagnostics::stderr(),
        };
        db.reconcile()?;
        Ok(db)
    }

    /// Open the tiers named by a [`DbConfig`].
    pub fn from_config(config: &DbConfig, registry: Arc<ResolverRegistry>) -> DbResult<Self> {
        Self::new(&config.global_cache, &config.local_cache, registry)
    }

    /// Replace the calendar used for not-found freshness.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Send diagnostics somewhere other than standard error.
    pub fn with_diagnostics(mut self, sink: impl Write + Send + 'static) -> Self {
        self.diagnostics = Diagnostics::new(sink);
        self
    }

    /// Get a cache tier.
    pub fn cache(&self, tier: Tier) -> &DbCache {
        match tier {
            Tier::Global => &self.global,
            Tier::Local => &self.local,
        }
    }

    /// Get the resolver registry.
    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// Tiers in write order.
    fn tiers(&self) -> [(Tier, &DbCache); 2] {
        [(Tier::Global, &self.global), (Tier::Local, &self.local)]
    }

    /// Resolve a reference, consulting the cache first.
    ///
    /// Returns `Ok(None)` for unrecognized prefixes (reported on the
    /// diagnostics channel) and for references the resolver cannot find.
    /// Only cache store failures are returned as errors.
    pub fn fetch(
        &self,
        reference: &str,
        year: Option<&str>,
        opts: &FetchOptions,
    ) -> DbResult<Option<Box<dyn BibliographicItem>>> {
        let reference = match Reference::normalize(reference, year, opts, &self.registry) {
            Ok(reference) => reference,
            Err(e @ DbError::UnrecognizedPrefix { .. }) => {
                warn!(error = %e, "unrecognised reference prefix");
                self.diagnostics.report(&e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let resolver = self
            .registry
            .by_prefix(&reference.prefix)
            .ok_or_else(|| DbError::UnrecognizedPrefix {
                reference: reference.to_string(),
                allowed: self.registry.prefixes().join(", "),
            })?;
        let key = reference.cache_key();
        let today = self.clock.today();

        if let Some((tier, entry)) = self.lookup(key.as_str())? {
            match &entry {
                CacheEntry::Found { payload, .. } => match resolver.deserialize(payload) {
                    Ok(item) => {
                        debug!(key = %key, %tier, "cache hit");
                        if tier == Tier::Global {
                            self.local.set(key.as_str(), &entry)?;
                        }
                        return Ok(Some(item));
                    }
                    Err(e) => {
                        warn!(key = %key, %tier, error = %e, "cached record no longer parses, refetching");
                    }
                },
                CacheEntry::NotFound { fetched, .. } => {
                    if policy::not_found_is_fresh(*fetched, today) {
                        debug!(key = %key, %tier, "not-found recorded today");
                        return Ok(None);
                    }
                    debug!(key = %key, %tier, fetched = %fetched, "not-found is stale, refetching");
                }
            }
        } else {
            debug!(key = %key, "cache miss");
        }

        self.fetch_and_store(resolver.as_ref(), &reference, &key, opts)
    }

    /// Call the resolver once and write the outcome through to both tiers.
    fn fetch_and_store(
        &self,
        resolver: &dyn Resolver,
        reference: &Reference,
        key: &CacheKey,
        opts: &FetchOptions,
    ) -> DbResult<Option<Box<dyn BibliographicItem>>> {
        let version = resolver.schema_version().to_string();
        let fetched = self.clock.today();

        let outcome = resolver.fetch(reference, opts).and_then(|found| match found {
            Some(item) => resolver
                .serialize(item.as_ref())
                .map(|payload| Some((item, payload))),
            None => Ok(None),
        });

        let (entry, item) = match outcome {
            Ok(Some((item, payload))) => {
                info!(key = %key, docid = ?item.docidentifier(), "resolved reference");
                let entry = CacheEntry::Found {
                    payload,
                    version,
                    fetched,
                };
                (entry, Some(item))
            }
            Ok(None) => {
                info!(key = %key, "document not found");
                (CacheEntry::NotFound { version, fetched }, None)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "resolver failed, recording not-found");
                (CacheEntry::NotFound { version, fetched }, None)
            }
        };

        self.write_through(key.as_str(), Some(&entry))?;
        Ok(item)
    }

    /// Local first, then global. Damaged entries are evicted and skipped.
    fn lookup(&self, key: &str) -> DbResult<Option<(Tier, CacheEntry)>> {
        for (tier, cache) in [(Tier::Local, &self.local), (Tier::Global, &self.global)] {
            match cache.get(key) {
                Ok(Some(entry)) => return Ok(Some((tier, entry))),
                Ok(None) => {}
                Err(e) if e.is_damaged_entry() => {
                    warn!(key, %tier, error = %e, "damaged cache entry, evicting");
                    cache.delete(key)?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Write (or delete, for `None`) in every tier.
    ///
    /// Tiers are written independently: a failure in one does not stop the
    /// other, and the first failure is returned once both were attempted.
    fn write_through(&self, key: &str, entry: Option<&CacheEntry>) -> DbResult<()> {
        let mut first_error = None;
        for (tier, cache) in self.tiers() {
            let result = match entry {
                Some(entry) => cache.set(key, entry),
                None => cache.delete(key),
            };
            if let Err(e) = result {
                warn!(key, %tier, error = %e, "cache write failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Store an arbitrary value under `key` in both tiers; `None` deletes it.
    pub fn save_entry(&self, key: &str, value: Option<&str>) -> DbResult<()> {
        let entry = value.map(|payload| CacheEntry::Found {
            payload: payload.to_string(),
            version: self.schema_version_for(key),
            fetched: self.clock.today(),
        });
        self.write_through(key, entry.as_ref())
    }

    /// Load a value stored under `key`, local tier first.
    pub fn load_entry(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self
            .lookup(key)?
            .and_then(|(_, entry)| entry.payload().map(String::from)))
    }

    /// Current schema version of the family owning `key`, or empty.
    fn schema_version_for(&self, key: &str) -> String {
        key_family(key)
            .and_then(|family| self.registry.by_family(&family_dir(Some(family))))
            .map(|resolver| resolver.schema_version().to_string())
            .unwrap_or_default()
    }

    /// Serialize every cached record of the local tier into one document.
    ///
    /// ```text
    /// <documents>
    ///   <bibdata>...</bibdata>
    ///   ...
    /// </documents>
    /// ```
    pub fn to_xml(&self) -> DbResult<String> {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<documents>\n");

        for (key, entry) in self.local.all()? {
            let Some(payload) = entry.payload() else {
                continue;
            };
            let Some(resolver) = key_family(&key).and_then(|f| self.registry.by_prefix(f)) else {
                debug!(key = %key, "no resolver for cached entry, skipping");
                continue;
            };

            let record = match resolver
                .deserialize(payload)
                .and_then(|item| resolver.serialize(item.as_ref()))
            {
                Ok(record) => record,
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping unparseable cached record");
                    continue;
                }
            };

            xml.push_str(strip_xml_declaration(&record).trim());
            xml.push('\n');
        }

        xml.push_str("</documents>\n");
        Ok(xml)
    }

    /// Purge families whose stored schema version differs from the resolver's.
    ///
    /// Families without a registered resolver are left alone. Both tiers are
    /// always attempted; the first error is returned afterwards.
    fn reconcile(&self) -> DbResult<()> {
        let mut families = BTreeSet::new();
        for (_, cache) in self.tiers() {
            families.extend(cache.families()?);
        }

        let mut first_error = None;
        for family in families {
            let Some(resolver) = self.registry.by_family(&family) else {
                debug!(family = %family, "no resolver for cached family, skipping version check");
                continue;
            };
            let expected = resolver.schema_version();

            let mut obsolete = false;
            for (tier, cache) in self.tiers() {
                match cache.family_version(&family) {
                    Ok(Some(stored)) if stored != expected => {
                        debug!(family = %family, %tier, stored = %stored, expected, "schema version changed");
                        obsolete = true;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(family = %family, %tier, error = %e, "failed to read cached version");
                        first_error.get_or_insert(e);
                    }
                }
            }
            if !obsolete {
                continue;
            }

            for (tier, cache) in self.tiers() {
                match cache.purge_family(&family) {
                    Ok(count) => {
                        warn!(family = %family, %tier, count, "cache version is obsolete and cache is cleared")
                    }
                    Err(e) => {
                        warn!(family = %family, %tier, error = %e, "failed to purge obsolete cache");
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

fn strip_xml_declaration(record: &str) -> &str {
    let trimmed = record.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return &trimmed[end + 2..];
        }
    }
    trimmed
}
