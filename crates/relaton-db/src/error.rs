//! Error types for the bibliographic cache.

/// Cache engine errors.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// No registered resolver claims the reference.
    #[error("{reference} does not have a recognised prefix: {allowed}")]
    UnrecognizedPrefix { reference: String, allowed: String },

    /// Cache store is unavailable or an I/O operation on it failed.
    #[error("cache error: {message}")]
    Cache { message: String },

    /// Stored payload does not match the digest recorded in its metadata.
    #[error("integrity mismatch for {key}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    /// Entry files exist but cannot be decoded.
    #[error("corrupt cache entry {key}: {message}")]
    CorruptEntry { key: String, message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl DbError {
    /// Whether the error only concerns the reference being resolved.
    ///
    /// Recoverable errors never escape `Db::fetch`: a bad reference is
    /// reported on the diagnostics channel and a damaged entry is evicted and
    /// refetched. Everything else does.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedPrefix { .. }
                | Self::IntegrityMismatch { .. }
                | Self::CorruptEntry { .. }
        )
    }

    /// Whether the error means the entry on disk is damaged.
    pub fn is_damaged_entry(&self) -> bool {
        matches!(
            self,
            Self::IntegrityMismatch { .. } | Self::CorruptEntry { .. }
        )
    }
}

/// Errors reported by a [`Resolver`](crate::Resolver).
///
/// The engine does not distinguish between them: every variant ends up as a
/// not-found sentinel in both tiers.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// The source has no document for the reference.
    #[error("document not found: {code}")]
    NotFound { code: String },

    /// Transport failure talking to the source.
    #[error("network error: {message}")]
    Network { message: String },

    /// Record could not be built from or rendered to its serialized form.
    #[error("parse error: {message}")]
    Parse { message: String },
}

/// Result type for cache operations.
pub type DbResult<T> = Result<T, DbError>;
