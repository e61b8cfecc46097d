use std::sync::Arc;

use thiserror::Error;

use bazaar_core::{ExpectedVersion, ItemId};
use bazaar_market::Item;

/// Item store operation error.
///
/// These are **infrastructure errors** (storage, concurrency) as opposed to
/// domain errors (value, state, payment).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("item {0} is not in the store")]
    NotFound(ItemId),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Append-only registry of item snapshots.
///
/// ## Append Semantics
///
/// `append()` adds a newly listed item at the next sequence position. The
/// item's id must equal the current `len()`; a mismatch means another caller
/// listed first and is reported as `Concurrency` (the caller may retry with a
/// fresh id). Items are never removed.
///
/// ## Save Semantics
///
/// `save()` replaces the snapshot of an existing item. With
/// `ExpectedVersion::Exact(v)` the stored item must still be at version `v`.
/// `ExpectedVersion::Any` is reserved for restoring a pre-operation snapshot
/// when an operation is unwound.
///
/// ## Implementation Requirements
///
/// - Ids are dense and start at 0.
/// - Every call is atomic; no lock may be held once a call returns, because
///   the ledger makes outbound transfers (which may re-enter) between calls.
pub trait ItemStore: Send + Sync {
    /// Number of items ever listed (also the next id).
    fn len(&self) -> Result<u64, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Append a newly listed item at position `item.id()`.
    fn append(&self, item: Item) -> Result<ItemId, StoreError>;

    /// Load the current snapshot of an item.
    fn load(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    /// Replace the snapshot of an existing item.
    fn save(&self, item: Item, expected_version: ExpectedVersion) -> Result<(), StoreError>;

    /// The most recently listed item.
    fn last(&self) -> Result<Option<Item>, StoreError>;
}

impl<S> ItemStore for Arc<S>
where
    S: ItemStore + ?Sized,
{
    fn len(&self) -> Result<u64, StoreError> {
        (**self).len()
    }

    fn append(&self, item: Item) -> Result<ItemId, StoreError> {
        (**self).append(item)
    }

    fn load(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        (**self).load(id)
    }

    fn save(&self, item: Item, expected_version: ExpectedVersion) -> Result<(), StoreError> {
        (**self).save(item, expected_version)
    }

    fn last(&self) -> Result<Option<Item>, StoreError> {
        (**self).last()
    }
}
