//! Slot entries
//!
//! Each occupied slot in a store holds either a value entry or a nested
//! entry. Value entries are immutable once installed: the typed value is
//! frozen behind an `Arc`, and its tree form is materialized lazily, at most
//! once per entry instance. Nested entries hold a child store for a
//! sub-namespace; cloning one shares the child.

use crate::store::TagStore;
use crate::tag::Tag;
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use tagstore_core::TreeValue;

#[derive(Clone)]
pub(crate) enum Entry {
    Value(ValueEntry),
    Nested(NestedEntry),
}

impl Entry {
    pub fn key(&self) -> &str {
        match self {
            Entry::Value(v) => v.key(),
            Entry::Nested(n) => n.key(),
        }
    }

    /// Tree form of the slot, used for cache collapse and cross-type reads
    pub fn tree_value(&self) -> TreeValue {
        match self {
            Entry::Value(v) => v.tree().clone(),
            Entry::Nested(n) => TreeValue::Compound(n.store().as_tree()),
        }
    }

    /// Copy for store duplication: value entries are immutable and shared,
    /// nested entries fork their child store recursively
    pub fn deep_copy(&self) -> Entry {
        match self {
            Entry::Value(v) => Entry::Value(v.clone()),
            Entry::Nested(n) => {
                Entry::Nested(NestedEntry::new(n.key().to_string(), n.store().copy()))
            }
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Value(v) => f.debug_tuple("Value").field(&v.key()).finish(),
            Entry::Nested(n) => f.debug_tuple("Nested").field(&n.key()).finish(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct ValueEntry {
    inner: Arc<ValueEntryInner>,
}

struct ValueEntryInner {
    key: String,
    class: TypeId,
    value: Arc<dyn Any + Send + Sync>,
    compute: Box<dyn Fn() -> TreeValue + Send + Sync>,
    tree: OnceCell<TreeValue>,
}

impl ValueEntry {
    pub fn new<T: Send + Sync + 'static>(tag: &Tag<T>, value: T) -> ValueEntry {
        let value = Arc::new(value);
        let stored: Arc<dyn Any + Send + Sync> = value.clone();
        let write = tag.write_fn();
        ValueEntry {
            inner: Arc::new(ValueEntryInner {
                key: tag.key().to_string(),
                class: tag.class(),
                value: stored,
                compute: Box::new(move || write(value.as_ref())),
                tree: OnceCell::new(),
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn class(&self) -> TypeId {
        self.inner.class
    }

    /// Memoized tree form, computed on first access
    pub fn tree(&self) -> &TreeValue {
        self.inner.tree.get_or_init(|| (self.inner.compute)())
    }

    /// The stored value, if `T` matches the class it was written with
    pub fn typed_value<T: Clone + 'static>(&self) -> Option<T> {
        self.inner.value.downcast_ref::<T>().cloned()
    }
}

#[derive(Clone)]
pub(crate) struct NestedEntry {
    key: String,
    store: TagStore,
}

impl NestedEntry {
    pub fn new(key: String, store: TagStore) -> NestedEntry {
        NestedEntry { key, store }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &TagStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_entry_typed_access() {
        let tag = Tag::int("entry-test-int");
        let entry = ValueEntry::new(&tag, 42i64);
        assert_eq!(entry.typed_value::<i64>(), Some(42));
        assert_eq!(entry.typed_value::<String>(), None);
        assert_eq!(entry.key(), "entry-test-int");
        assert_eq!(entry.class(), std::any::TypeId::of::<i64>());
    }

    #[test]
    fn test_value_entry_tree_form() {
        let tag = Tag::string("entry-test-str");
        let entry = ValueEntry::new(&tag, "hello".to_string());
        assert_eq!(entry.tree(), &TreeValue::String("hello".to_string()));
        // Memoized: repeated access yields the same reference
        assert!(std::ptr::eq(entry.tree(), entry.tree()));
    }

    #[test]
    fn test_clone_shares_memoized_tree() {
        let tag = Tag::int("entry-test-shared");
        let entry = ValueEntry::new(&tag, 7i64);
        let clone = entry.clone();
        assert!(std::ptr::eq(entry.tree(), clone.tree()));
    }

    #[test]
    fn test_entry_debug_names_variant() {
        let tag = Tag::int("entry-test-debug");
        let entry = Entry::Value(ValueEntry::new(&tag, 1i64));
        let dbg = format!("{entry:?}");
        assert!(dbg.contains("Value"));
        assert!(dbg.contains("entry-test-debug"));
    }
}
