//! Cached resolution of standards-document references.
//!
//! This crate turns free-text references such as `ISO 19115-1`,
//! `NIST SP 800-38B` or `CN(GB/T 20223-2006)` into bibliographic records,
//! providing:
//!
//! - Reference normalization into canonical `PREFIX(CODE[:YEAR])` cache keys
//! - Dispatch to pluggable per-family resolvers
//! - Two persistent cache tiers (local overrides global) with write-through
//! - Not-found memoization valid for the calendar day it was recorded
//! - Schema-version reconciliation when the engine is opened
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use relaton_db::{Db, FetchOptions, ResolverRegistry};
//!
//! # fn example(registry: ResolverRegistry) -> anyhow::Result<()> {
//! let db = Db::new("~/.relaton/cache", "relaton/cache", Arc::new(registry))?;
//!
//! if let Some(item) = db.fetch("ISO 19115-1", None, &FetchOptions::new())? {
//!     println!("resolved {:?}", item.docidentifier());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `RELATON_GLOBAL_CACHE` | Global tier directory (default: `~/.relaton/cache`) |
//! | `RELATON_LOCAL_CACHE` | Local tier directory (default: `relaton/cache`) |

pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod diagnostics;
mod digest;
pub mod error;
pub mod item;
pub mod reference;
pub mod resolver;

// Re-export main types
pub use cache::{CacheEntry, CacheMeta, DbCache, EntryStatus};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::DbConfig;
pub use db::{Db, Tier};
pub use diagnostics::Diagnostics;
pub use digest::{grammar_hash, grammar_hash_str};
pub use error::{DbError, DbResult, ResolverError};
pub use item::BibliographicItem;
pub use reference::{CacheKey, Reference};
pub use resolver::{FetchOptions, Resolver, ResolverRegistry};
