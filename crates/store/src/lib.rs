//! Slot-indexed tag storage engine
//!
//! This crate implements the concurrent tag store: typed [`Tag`] descriptors
//! addressing process-wide interned slots, the [`TagStore`] container with
//! lock-free reads and serialized writes, nested path namespaces, and
//! immutable [`TagSnapshot`] views.
//!
//! ```
//! use tagstore_store::{Tag, TagStore};
//!
//! let store = TagStore::new();
//! let damage = Tag::int("Damage").at_path(["display"]);
//! store.set(&damage, 7);
//! assert_eq!(store.get(&damage), Some(7));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod entry;
mod registry;
pub mod snapshot;
pub mod store;
pub mod tag;
pub mod traits;

pub use snapshot::TagSnapshot;
pub use store::TagStore;
pub use tag::{PathSegment, Tag};
pub use traits::TagReadable;
