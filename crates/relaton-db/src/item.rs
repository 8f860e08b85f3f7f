//! Contract for records produced by resolvers.

use std::any::Any;
use std::fmt;

/// A structured bibliographic record.
///
/// The cache engine never looks inside a record; it only hands it back to
/// the resolver that produced it for serialization. Callers recover the
/// concrete family type with [`downcast_ref`](dyn BibliographicItem::downcast_ref).
pub trait BibliographicItem: fmt::Debug + Send + Sync + 'static {
    /// Primary document identifier, e.g. `ISO 19115-1:2014`.
    fn docidentifier(&self) -> Option<&str>;

    /// Upcast for downcasting to the family type.
    fn as_any(&self) -> &dyn Any;
}

impl dyn BibliographicItem {
    /// Borrow the record as its concrete family type.
    pub fn downcast_ref<T: BibliographicItem>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Whether the record is of family type `T`.
    pub fn is<T: BibliographicItem>(&self) -> bool {
        self.as_any().is::<T>()
    }
}
