//! Immutable store snapshots
//!
//! A [`TagSnapshot`] wraps the cache a store published at some point in time:
//! the slot array as of that moment plus the fully materialized tree. Reads
//! against it never observe later writes and never take a lock.

use crate::store::{self, SlotArray};
use crate::tag::Tag;
use crate::traits::TagReadable;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tagstore_core::Compound;

/// Published read state: frozen slots plus their collapsed tree form
pub(crate) struct StoreCache {
    pub(crate) slots: Arc<SlotArray>,
    pub(crate) tree: Compound,
}

static EMPTY_CACHE: Lazy<Arc<StoreCache>> = Lazy::new(|| {
    Arc::new(StoreCache {
        slots: Arc::new(Vec::new()),
        tree: Compound::empty(),
    })
});

impl StoreCache {
    /// Canonical cache for an empty store, shared process-wide
    pub(crate) fn shared_empty() -> Arc<StoreCache> {
        EMPTY_CACHE.clone()
    }
}

/// Point-in-time read-only view of a store
///
/// Obtained from [`TagStore::readable_copy`](crate::TagStore::readable_copy).
/// Cloning shares the underlying cache.
#[derive(Clone)]
pub struct TagSnapshot {
    cache: Arc<StoreCache>,
}

impl TagSnapshot {
    pub(crate) fn new(cache: Arc<StoreCache>) -> TagSnapshot {
        TagSnapshot { cache }
    }

    /// The snapshot's materialized tree
    pub fn as_tree(&self) -> Compound {
        self.cache.tree.clone()
    }
}

impl TagReadable for TagSnapshot {
    fn get_tag<T: Clone + Send + Sync + 'static>(&self, tag: &Tag<T>) -> Option<T> {
        if tag.is_view() {
            return store::read_view(&self.cache.tree, tag);
        }
        store::read_slots(self.cache.slots.clone(), tag)
    }
}

impl std::fmt::Debug for TagSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagSnapshot")
            .field("tree", &self.cache.tree)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_empty_is_singleton() {
        let a = StoreCache::shared_empty();
        let b = StoreCache::shared_empty();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.tree.is_empty());
        assert!(a.slots.is_empty());
    }
}
