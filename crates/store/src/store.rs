//! Concurrent tag store
//!
//! A [`TagStore`] is a sparse slot array of entries behind an
//! [`ArcSwap`], plus a per-store mutex serializing writers and guarding the
//! lazily rebuilt read cache. Readers load the published slot array without
//! locking; the cache (slots plus materialized tree) is rebuilt on demand
//! after writes invalidate it.
//!
//! Nested sub-namespaces are child stores installed as nested entries in
//! their parent's slots. Path writes lock one store at a time while
//! descending, so two
//! racing structural writes resolve last-writer-wins rather than
//! deadlocking.

use crate::entry::{Entry, NestedEntry, ValueEntry};
use crate::snapshot::{StoreCache, TagSnapshot};
use crate::tag::{PathSegment, Tag};
use crate::traits::TagReadable;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tagstore_core::{Compound, TreeValue};

pub(crate) type SlotArray = Vec<Option<Entry>>;

/// Concurrent, path-addressable tag container
///
/// Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct TagStore {
    shared: Arc<Shared>,
}

struct Shared {
    slots: ArcSwap<SlotArray>,
    sync: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    cache: Option<Arc<StoreCache>>,
}

impl TagStore {
    /// Create an empty store
    pub fn new() -> TagStore {
        TagStore::with_parts(Vec::new(), None)
    }

    fn with_parts(slots: SlotArray, cache: Option<Arc<StoreCache>>) -> TagStore {
        TagStore {
            shared: Arc::new(Shared {
                slots: ArcSwap::from_pointee(slots),
                sync: Mutex::new(CacheState { cache }),
            }),
        }
    }

    /// Build a store from a materialized tree
    ///
    /// Compound members are split into nested entries, so the result is
    /// structurally identical to a store that was populated through path
    /// writes. Empty compound members vanish.
    pub fn from_tree(tree: &Compound) -> TagStore {
        let store = TagStore::new();
        for (key, value) in tree.iter() {
            store.set(&Tag::tree(key), value.clone());
        }
        store
    }

    /// Resolve `tag` to its current value
    pub fn get<T: Clone + Send + Sync + 'static>(&self, tag: &Tag<T>) -> Option<T> {
        if tag.is_view() {
            return read_view(&self.as_tree(), tag);
        }
        read_slots(self.load_slots(), tag)
    }

    /// Store a value under `tag`
    pub fn set<T: Send + Sync + 'static>(&self, tag: &Tag<T>, value: T) {
        self.set_opt(tag, Some(value));
    }

    /// Remove the value under `tag`
    ///
    /// Removing the last entry of a nested namespace removes the namespace
    /// itself, recursively up the path. Removing an absent tag is a no-op.
    pub fn remove<T: Send + Sync + 'static>(&self, tag: &Tag<T>) {
        self.set_opt(tag, None);
    }

    /// Store or remove in one call; `None` removes
    pub fn set_opt<T: Send + Sync + 'static>(&self, tag: &Tag<T>, value: Option<T>) {
        if tag.is_view() {
            match value {
                Some(v) => {
                    if let TreeValue::Compound(c) = tag.to_tree(&v) {
                        self.update_content(&c);
                    }
                }
                None => self.update_content(&Compound::empty()),
            }
            return;
        }
        match value {
            Some(v) => {
                // A compound written through a tree-typed tag becomes a
                // nested namespace rather than an opaque value, keeping the
                // store path-addressable under it. The compound is imported
                // into a child store first and installed as one slot
                // publication, so racing compound writes to the same key
                // land whole, last writer wins. An empty compound is a
                // removal.
                if let Some(TreeValue::Compound(compound)) =
                    (&v as &dyn Any).downcast_ref::<TreeValue>()
                {
                    let entry = if compound.is_empty() {
                        None
                    } else {
                        Some(Entry::Nested(NestedEntry::new(
                            tag.key().to_string(),
                            TagStore::from_tree(compound),
                        )))
                    };
                    self.write(tag.index(), tag.path(), entry);
                    return;
                }
                let v = tag.apply_copy(v);
                let entry = Entry::Value(ValueEntry::new(tag, v));
                self.write(tag.index(), tag.path(), Some(entry));
            }
            None => self.write(tag.index(), tag.path(), None),
        }
    }

    /// Type-erased write core shared by set and remove
    fn write(&self, leaf_index: u32, path: Option<&[PathSegment]>, entry: Option<Entry>) {
        let mut target = self.clone();
        let mut walked: SmallVec<[TagStore; 4]> = SmallVec::new();
        let removing = entry.is_none();
        if let Some(path) = path {
            for segment in path {
                let child = if removing {
                    // Removal never materializes missing namespaces
                    match target.peek_child(segment) {
                        Some(child) => child,
                        None => return,
                    }
                } else {
                    target.materialize_child(segment)
                };
                walked.push(child.clone());
                target = child;
            }
            if removing {
                if !target.clear_slot(leaf_index) {
                    return;
                }
                // Prune namespaces emptied by the removal, bottom-up,
                // stopping at the first one that still has content
                for i in (0..walked.len()).rev() {
                    if !walked[i].is_empty() {
                        break;
                    }
                    let parent = if i == 0 { self } else { &walked[i - 1] };
                    parent.clear_slot(path[i].index());
                }
                for store in &walked {
                    store.invalidate_cache();
                }
                self.invalidate_cache();
                tracing::trace!(
                    target: "tagstore::store",
                    depth = path.len(),
                    "Removed nested entry"
                );
                return;
            }
        }
        match entry {
            Some(entry) => target.put_slot(leaf_index, entry),
            None => {
                if !target.clear_slot(leaf_index) {
                    return;
                }
            }
        }
        for store in &walked {
            store.invalidate_cache();
        }
        self.invalidate_cache();
    }

    fn load_slots(&self) -> Arc<SlotArray> {
        self.shared.slots.load_full()
    }

    fn peek_child(&self, segment: &PathSegment) -> Option<TagStore> {
        let slots = self.load_slots();
        match slots.get(segment.index() as usize)?.as_ref()? {
            Entry::Nested(nested) => Some(nested.store().clone()),
            Entry::Value(_) => None,
        }
    }

    /// Resolve the child store for `segment`, installing one if the slot is
    /// vacant or holds a tree-structured value that can be imported
    fn materialize_child(&self, segment: &PathSegment) -> TagStore {
        let mut state = self.shared.sync.lock();
        let slots = self.load_slots();
        let index = segment.index() as usize;
        let child = match slots.get(index).and_then(Option::as_ref) {
            Some(Entry::Nested(nested)) => return nested.store().clone(),
            Some(Entry::Value(value)) => match value.tree() {
                TreeValue::Compound(c) => TagStore::from_tree(c),
                // A scalar occupant is overwritten by the namespace
                _ => TagStore::new(),
            },
            None => TagStore::new(),
        };
        let mut next: SlotArray = (*slots).clone();
        if next.len() <= index {
            next.resize_with(index + 1, || None);
        }
        next[index] = Some(Entry::Nested(NestedEntry::new(
            segment.key().to_string(),
            child.clone(),
        )));
        self.shared.slots.store(Arc::new(next));
        state.cache = None;
        child
    }

    fn put_slot(&self, index: u32, entry: Entry) {
        let index = index as usize;
        let mut state = self.shared.sync.lock();
        let slots = self.load_slots();
        let mut next: SlotArray = (*slots).clone();
        if next.len() <= index {
            next.resize_with(index + 1, || None);
        }
        next[index] = Some(entry);
        self.shared.slots.store(Arc::new(next));
        state.cache = None;
    }

    /// Clear a slot; returns false when the index is out of bounds, meaning
    /// nothing was stored and no invalidation is needed
    fn clear_slot(&self, index: u32) -> bool {
        let index = index as usize;
        let mut state = self.shared.sync.lock();
        let slots = self.load_slots();
        if index >= slots.len() {
            return false;
        }
        let mut next: SlotArray = (*slots).clone();
        next[index] = None;
        self.shared.slots.store(Arc::new(next));
        state.cache = None;
        true
    }

    fn invalidate_cache(&self) {
        self.shared.sync.lock().cache = None;
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.load_slots().iter().all(Option::is_none)
    }

    /// Return the current cache, rebuilding it if a write invalidated it
    fn updated_cache(&self) -> Arc<StoreCache> {
        let mut state = self.shared.sync.lock();
        if let Some(cache) = &state.cache {
            return cache.clone();
        }
        let slots = self.load_slots();
        let mut builder = Compound::builder();
        for entry in slots.iter().flatten() {
            builder.put(entry.key().to_string(), entry.tree_value());
        }
        let cache = if builder.is_empty() {
            StoreCache::shared_empty()
        } else {
            tracing::trace!(
                target: "tagstore::cache",
                entries = builder.len(),
                "Rebuilt store cache"
            );
            Arc::new(StoreCache {
                slots,
                tree: builder.build(),
            })
        };
        state.cache = Some(cache.clone());
        cache
    }

    /// Collapse the store into its materialized tree
    pub fn as_tree(&self) -> Compound {
        self.updated_cache().tree.clone()
    }

    /// Freeze the current state into a lock-free read-only view
    pub fn readable_copy(&self) -> TagSnapshot {
        TagSnapshot::new(self.updated_cache())
    }

    /// Fork the store
    ///
    /// The copy is fully independent: later writes to either store are
    /// invisible to the other. Value entries are shared (they are immutable);
    /// nested namespaces are forked recursively.
    pub fn copy(&self) -> TagStore {
        let state = self.shared.sync.lock();
        let slots = self.load_slots();
        let copied: SlotArray = slots
            .iter()
            .map(|slot| slot.as_ref().map(Entry::deep_copy))
            .collect();
        TagStore::with_parts(copied, state.cache.clone())
    }

    /// Replace the store's entire content with `tree`
    pub fn update_content(&self, tree: &Compound) {
        let imported = TagStore::from_tree(tree);
        let slots = imported.load_slots();
        let mut state = self.shared.sync.lock();
        self.shared.slots.store(slots);
        state.cache = None;
        tracing::debug!(target: "tagstore::store", "Replaced store content");
    }
}

impl Default for TagStore {
    fn default() -> TagStore {
        TagStore::new()
    }
}

impl TagReadable for TagStore {
    fn get_tag<T: Clone + Send + Sync + 'static>(&self, tag: &Tag<T>) -> Option<T> {
        self.get(tag)
    }
}

impl fmt::Debug for TagStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagStore")
            .field("slots", &self.load_slots())
            .finish()
    }
}

/// Read a tag against a frozen slot array; shared by live reads and snapshots
pub(crate) fn read_slots<T: Clone + Send + Sync + 'static>(
    mut slots: Arc<SlotArray>,
    tag: &Tag<T>,
) -> Option<T> {
    if let Some(path) = tag.path() {
        match traverse_path(path, slots) {
            Some(resolved) => slots = resolved,
            None => return tag.create_default(),
        }
    }
    let entry = match slots.get(tag.index() as usize) {
        Some(Some(entry)) => entry,
        _ => return tag.create_default(),
    };
    match entry {
        Entry::Value(value) => {
            // Same slot, same value class: hand back the stored value
            // without a tree round-trip
            if value.class() == tag.class() {
                if let Some(v) = value.typed_value::<T>() {
                    return Some(v);
                }
            }
            match tag.from_tree(value.tree()) {
                Ok(v) => Some(v),
                Err(_) => tag.create_default(),
            }
        }
        Entry::Nested(nested) => {
            match tag.from_tree(&TreeValue::Compound(nested.store().as_tree())) {
                Ok(v) => Some(v),
                Err(_) => tag.create_default(),
            }
        }
    }
}

fn traverse_path(path: &[PathSegment], mut slots: Arc<SlotArray>) -> Option<Arc<SlotArray>> {
    for segment in path {
        let next = match slots.get(segment.index() as usize).and_then(Option::as_ref) {
            Some(Entry::Nested(nested)) => nested.store().load_slots(),
            // A tree-structured value mid-path is imported into a transient
            // store for this traversal only, never installed back
            Some(Entry::Value(value)) => match value.tree() {
                TreeValue::Compound(c) => TagStore::from_tree(c).load_slots(),
                _ => return None,
            },
            None => return None,
        };
        slots = next;
    }
    Some(slots)
}

pub(crate) fn read_view<T: Clone + Send + Sync + 'static>(
    tree: &Compound,
    tag: &Tag<T>,
) -> Option<T> {
    match tag.from_tree(&TreeValue::Compound(tree.clone())) {
        Ok(v) => Some(v),
        Err(_) => tag.create_default(),
    }
}
