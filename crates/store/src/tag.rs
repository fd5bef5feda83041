//! Tag descriptors
//!
//! A [`Tag`] is an immutable, typed key identifier: it carries the slot index
//! assigned by the registry, an optional nested-path chain, the converters
//! bridging the typed value and its tree form, an optional default factory,
//! an optional copy hook applied on writes, and a view flag for descriptors
//! computed over the whole materialized tree.
//!
//! Tags are cheap to clone (`Arc` inner) and safe to share across threads.
//! Two tags "share a value" when they address the same slot and carry the
//! same value class; the store then returns the stored value directly,
//! skipping the tree round-trip.

use crate::registry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use tagstore_core::{Compound, Result, TagError, TreeValue};

pub(crate) type ReadFn<T> = dyn Fn(&TreeValue) -> Result<T> + Send + Sync;
pub(crate) type WriteFn<T> = dyn Fn(&T) -> TreeValue + Send + Sync;
type DefaultFn<T> = dyn Fn() -> T + Send + Sync;
type CopyFn<T> = dyn Fn(&T) -> T + Send + Sync;

/// One segment of a nested-path chain: a sub-namespace key and its slot index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    index: u32,
    key: String,
}

impl PathSegment {
    pub(crate) fn new(key: impl Into<String>) -> PathSegment {
        let key = key.into();
        PathSegment {
            index: registry::slot_index_for(&key),
            key,
        }
    }

    /// Slot index of this segment in its parent store
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Key name of the sub-namespace
    pub fn key(&self) -> &str {
        &self.key
    }
}

struct Inner<T> {
    key: String,
    index: u32,
    path: Option<Arc<[PathSegment]>>,
    class: TypeId,
    read: Arc<ReadFn<T>>,
    write: Arc<WriteFn<T>>,
    default: Option<Arc<DefaultFn<T>>>,
    copy: Option<Arc<CopyFn<T>>>,
    view: bool,
}

impl<T> Clone for Inner<T> {
    fn clone(&self) -> Self {
        Inner {
            key: self.key.clone(),
            index: self.index,
            path: self.path.clone(),
            class: self.class,
            read: self.read.clone(),
            write: self.write.clone(),
            default: self.default.clone(),
            copy: self.copy.clone(),
            view: self.view,
        }
    }
}

/// Typed attribute descriptor
///
/// Immutable after construction. All combinators return a new tag; the slot
/// index is preserved so derived tags keep addressing the same logical key.
pub struct Tag<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Tag<T> {
    fn clone(&self) -> Self {
        Tag {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Tag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tag")
            .field("key", &self.inner.key)
            .field("index", &self.inner.index)
            .field("path", &self.inner.path)
            .field("view", &self.inner.view)
            .finish()
    }
}

// View tags never address a slot, so they share one sentinel index instead
// of consuming a registry assignment. Slot lookups treat it as out of
// bounds; the view branch is taken before any lookup happens.
const VIEW_INDEX: u32 = u32::MAX;

impl<T: Send + Sync + 'static> Tag<T> {
    fn build(
        key: &str,
        index: u32,
        read: Arc<ReadFn<T>>,
        write: Arc<WriteFn<T>>,
        view: bool,
    ) -> Tag<T> {
        Tag {
            inner: Arc::new(Inner {
                index,
                key: key.to_string(),
                path: None,
                class: TypeId::of::<T>(),
                read,
                write,
                default: None,
                copy: None,
                view,
            }),
        }
    }

    /// Create a tag from a custom converter pair
    ///
    /// `read` fails with [`TagError`] when the stored tree form has an
    /// incompatible shape; the store recovers by substituting the default.
    pub fn from_converters<R, W>(key: &str, read: R, write: W) -> Tag<T>
    where
        R: Fn(&TreeValue) -> Result<T> + Send + Sync + 'static,
        W: Fn(&T) -> TreeValue + Send + Sync + 'static,
    {
        Tag::build(
            key,
            registry::slot_index_for(key),
            Arc::new(read),
            Arc::new(write),
            false,
        )
    }

    /// Create a view tag, computed over the whole materialized tree instead
    /// of a single slot
    ///
    /// Reading applies `read` to the store's full tree snapshot; writing
    /// replaces the store's entire content with the compound `write` yields.
    pub fn view<R, W>(read: R, write: W) -> Tag<T>
    where
        R: Fn(&Compound) -> Result<T> + Send + Sync + 'static,
        W: Fn(&T) -> Compound + Send + Sync + 'static,
    {
        let read = move |v: &TreeValue| match v.as_compound() {
            Some(c) => read(c),
            None => Err(TagError::mismatch("Compound", v.type_name())),
        };
        let write = move |t: &T| TreeValue::Compound(write(t));
        Tag::build("", VIEW_INDEX, Arc::new(read), Arc::new(write), true)
    }

    /// Override the value returned when the tag is absent
    pub fn default_value(self, value: T) -> Tag<T>
    where
        T: Clone,
    {
        self.default_with(move || value.clone())
    }

    /// Override the absent-value default with a factory
    pub fn default_with(self, f: impl Fn() -> T + Send + Sync + 'static) -> Tag<T> {
        let mut inner = (*self.inner).clone();
        inner.default = Some(Arc::new(f));
        Tag {
            inner: Arc::new(inner),
        }
    }

    /// Install a copy hook applied to values on write
    ///
    /// Used for interior-mutable value types that must not be shared between
    /// the caller and the store.
    pub fn with_copy(self, f: impl Fn(&T) -> T + Send + Sync + 'static) -> Tag<T> {
        let mut inner = (*self.inner).clone();
        inner.copy = Some(Arc::new(f));
        Tag {
            inner: Arc::new(inner),
        }
    }

    /// Re-root the tag under a chain of nested sub-namespaces
    ///
    /// Replaces any previous path. Each segment key is interned like a
    /// top-level key, so a tree tag for the same name resolves to the same
    /// slot as the namespace itself.
    pub fn at_path<I>(self, path: I) -> Tag<T>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let segments: Vec<PathSegment> = path.into_iter().map(PathSegment::new).collect();
        self.at_segments(segments)
    }

    pub(crate) fn at_segments(self, segments: Vec<PathSegment>) -> Tag<T> {
        let mut inner = (*self.inner).clone();
        inner.path = if segments.is_empty() {
            None
        } else {
            Some(Arc::from(segments))
        };
        Tag {
            inner: Arc::new(inner),
        }
    }

    /// Derive a transformed tag sharing the same slot
    ///
    /// The derived tag reads through `to` and writes through `from`. Its
    /// value class differs from the source tag's, so reads across the two go
    /// through the tree form rather than the share-value fast path.
    pub fn map<U, F, G>(self, to: F, from: G) -> Tag<U>
    where
        U: Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
        G: Fn(&U) -> T + Send + Sync + 'static,
    {
        let read = self.inner.read.clone();
        let write = self.inner.write.clone();
        Tag {
            inner: Arc::new(Inner {
                key: self.inner.key.clone(),
                index: self.inner.index,
                path: self.inner.path.clone(),
                class: TypeId::of::<U>(),
                read: Arc::new(move |v: &TreeValue| read(v).map(&to)),
                write: Arc::new(move |u: &U| write(&from(u))),
                default: None,
                copy: None,
                view: self.inner.view,
            }),
        }
    }
}

impl<T> Tag<T> {
    /// Key name this tag was created for
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Stable slot index assigned by the registry
    pub fn index(&self) -> u32 {
        self.inner.index
    }

    /// Nested-path chain, if the tag is re-rooted
    pub fn path(&self) -> Option<&[PathSegment]> {
        self.inner.path.as_deref()
    }

    /// Whether this tag is computed over the whole tree
    pub fn is_view(&self) -> bool {
        self.inner.view
    }

    /// The value this tag resolves to when absent
    pub fn create_default(&self) -> Option<T> {
        self.inner.default.as_ref().map(|f| f())
    }

    /// Convert a tree form into the tag's value type
    pub fn from_tree(&self, value: &TreeValue) -> Result<T> {
        (self.inner.read)(value)
    }

    /// Convert a value into its tree form
    pub fn to_tree(&self, value: &T) -> TreeValue {
        (self.inner.write)(value)
    }

    pub(crate) fn class(&self) -> TypeId {
        self.inner.class
    }

    pub(crate) fn write_fn(&self) -> Arc<WriteFn<T>> {
        self.inner.write.clone()
    }

    pub(crate) fn apply_copy(&self, value: T) -> T {
        match &self.inner.copy {
            Some(f) => f(&value),
            None => value,
        }
    }
}

// ============================================================================
// Builtin constructors
// ============================================================================

impl Tag<bool> {
    /// Boolean tag
    pub fn boolean(key: &str) -> Tag<bool> {
        Tag::from_converters(
            key,
            |v| v.as_bool().ok_or_else(|| TagError::mismatch("Bool", v.type_name())),
            |b| TreeValue::Bool(*b),
        )
    }
}

impl Tag<i64> {
    /// Integer tag
    pub fn int(key: &str) -> Tag<i64> {
        Tag::from_converters(
            key,
            |v| v.as_int().ok_or_else(|| TagError::mismatch("Int", v.type_name())),
            |i| TreeValue::Int(*i),
        )
    }
}

impl Tag<f64> {
    /// Float tag
    pub fn float(key: &str) -> Tag<f64> {
        Tag::from_converters(
            key,
            |v| v.as_float().ok_or_else(|| TagError::mismatch("Float", v.type_name())),
            |f| TreeValue::Float(*f),
        )
    }
}

impl Tag<String> {
    /// String tag
    pub fn string(key: &str) -> Tag<String> {
        Tag::from_converters(
            key,
            |v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| TagError::mismatch("String", v.type_name()))
            },
            |s| TreeValue::String(s.clone()),
        )
    }
}

impl Tag<Vec<u8>> {
    /// Raw bytes tag
    pub fn bytes(key: &str) -> Tag<Vec<u8>> {
        Tag::from_converters(
            key,
            |v| {
                v.as_bytes()
                    .map(<[u8]>::to_vec)
                    .ok_or_else(|| TagError::mismatch("Bytes", v.type_name()))
            },
            |b| TreeValue::Bytes(b.clone()),
        )
    }
}

impl Tag<TreeValue> {
    /// Generic tree-typed tag: reads and writes the raw tree form
    ///
    /// Writing a compound through a tree tag splits it into nested entries;
    /// reading a nested namespace through one collapses it back.
    pub fn tree(key: &str) -> Tag<TreeValue> {
        Tag::from_converters(key, |v| Ok(v.clone()), Clone::clone)
    }
}

impl<T> Tag<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Serde-backed structure tag
    ///
    /// The value round-trips through its JSON representation into the tree
    /// form, so the stored shape is a compound and the tag is path-traversable
    /// like any other nested namespace. Conversion failures surface as the
    /// tag's default on read.
    pub fn structure(key: &str) -> Tag<T> {
        Tag::from_converters(
            key,
            |v: &TreeValue| {
                let json: serde_json::Value = v.clone().into();
                serde_json::from_value(json).map_err(|e| TagError::Serialization(e.to_string()))
            },
            |t: &T| {
                serde_json::to_value(t)
                    .ok()
                    .and_then(|json| TreeValue::try_from(json).ok())
                    .unwrap_or_else(|| TreeValue::Compound(Compound::empty()))
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_same_key_same_index_across_types() {
        // The registry interns by key name alone: the same logical key under
        // a different type descriptor must address the same slot
        let s = Tag::string("tag-test-shared-key");
        let i = Tag::int("tag-test-shared-key");
        let t = Tag::tree("tag-test-shared-key");
        assert_eq!(s.index(), i.index());
        assert_eq!(s.index(), t.index());
    }

    #[test]
    fn test_different_keys_different_indexes() {
        assert_ne!(Tag::int("tag-test-k1").index(), Tag::int("tag-test-k2").index());
    }

    #[test]
    fn test_path_segments_align_with_tree_tags() {
        let tag = Tag::string("Name").at_path(["tag-test-display"]);
        let path = tag.path().unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].key(), "tag-test-display");
        assert_eq!(path[0].index(), Tag::tree("tag-test-display").index());
    }

    #[test]
    fn test_at_path_replaces_previous_path() {
        let tag = Tag::int("x").at_path(["a", "b"]).at_path(["c"]);
        let path = tag.path().unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].key(), "c");
    }

    #[test]
    fn test_empty_path_is_absent() {
        let tag = Tag::int("x").at_path(Vec::<String>::new());
        assert!(tag.path().is_none());
    }

    #[test]
    fn test_default_value() {
        let tag = Tag::int("tag-test-defaulted").default_value(7);
        assert_eq!(tag.create_default(), Some(7));

        let plain = Tag::int("tag-test-plain");
        assert_eq!(plain.create_default(), None);
    }

    #[test]
    fn test_default_with_factory() {
        let tag = Tag::string("tag-test-factory").default_with(|| "fallback".to_string());
        assert_eq!(tag.create_default(), Some("fallback".to_string()));
    }

    #[test]
    fn test_converter_round_trip() {
        let tag = Tag::string("s");
        let tree = tag.to_tree(&"hello".to_string());
        assert_eq!(tree, TreeValue::String("hello".to_string()));
        assert_eq!(tag.from_tree(&tree).unwrap(), "hello");
    }

    #[test]
    fn test_converter_shape_mismatch() {
        let tag = Tag::int("i");
        let err = tag.from_tree(&TreeValue::Bool(true)).unwrap_err();
        assert_eq!(err, TagError::mismatch("Int", "Bool"));
    }

    #[test]
    fn test_map_shares_slot() {
        let base = Tag::int("tag-test-mapped");
        let mapped: Tag<String> = base.clone().map(|i| i.to_string(), |s| s.parse().unwrap_or(0));
        assert_eq!(base.index(), mapped.index());
        assert_eq!(mapped.from_tree(&TreeValue::Int(5)).unwrap(), "5");
        assert_eq!(mapped.to_tree(&"9".to_string()), TreeValue::Int(9));
    }

    #[test]
    fn test_with_copy_applied_on_write() {
        let tag = Tag::bytes("tag-test-copy").with_copy(|b| b.to_vec());
        assert_eq!(tag.apply_copy(vec![1, 2]), vec![1, 2]);

        let plain = Tag::int("tag-test-nocopy");
        assert_eq!(plain.apply_copy(5), 5);
    }

    #[test]
    fn test_view_flag() {
        let view: Tag<i64> = Tag::view(
            |c| {
                c.get("n")
                    .and_then(TreeValue::as_int)
                    .ok_or_else(|| TagError::mismatch("Int", "Compound"))
            },
            |n| {
                let mut b = Compound::builder();
                b.put("n", *n);
                b.build()
            },
        );
        assert!(view.is_view());
        assert!(!Tag::int("x").is_view());
    }

    #[test]
    fn test_view_tags_share_a_sentinel_slot() {
        let a: Tag<Compound> = Tag::view(|c| Ok(c.clone()), Clone::clone);
        let b: Tag<Compound> = Tag::view(|c| Ok(c.clone()), Clone::clone);
        assert_eq!(a.index(), b.index());
        // The sentinel can never collide with a registry-assigned slot
        assert_ne!(a.index(), Tag::int("tag-test-view-slot").index());
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Pos {
        x: i64,
        y: i64,
    }

    #[test]
    fn test_structure_tag_round_trip() {
        let tag = Tag::<Pos>::structure("tag-test-pos");
        let pos = Pos { x: 3, y: -4 };
        let tree = tag.to_tree(&pos);
        assert!(tree.is_compound());
        assert_eq!(tag.from_tree(&tree).unwrap(), pos);
    }

    #[test]
    fn test_structure_tag_mismatch_errors() {
        let tag = Tag::<Pos>::structure("tag-test-pos2");
        assert!(tag.from_tree(&TreeValue::Int(1)).is_err());
    }

    #[test]
    fn test_tag_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Tag<String>>();
        assert_send_sync::<Tag<TreeValue>>();
    }
}
