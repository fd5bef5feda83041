//! Read-side trait shared by live stores and snapshots

use crate::tag::Tag;

/// Read access to tagged values
pub trait TagReadable {
    /// Resolve `tag` to its current value
    ///
    /// Returns the stored value when present and convertible, otherwise the
    /// tag's default (which is `None` unless one was installed).
    fn get_tag<T: Clone + Send + Sync + 'static>(&self, tag: &Tag<T>) -> Option<T>;

    /// Whether `tag` resolves to a value
    ///
    /// A tag with a default always resolves.
    fn has_tag<T: Clone + Send + Sync + 'static>(&self, tag: &Tag<T>) -> bool {
        self.get_tag(tag).is_some()
    }
}
