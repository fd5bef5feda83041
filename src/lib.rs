//! tagstore - Concurrent, path-addressable tag storage
//!
//! tagstore is a generic container for typed attributes ("tags") attached to
//! a host object. Tags are identified by key and addressed through
//! process-wide interned slot indexes, so reads are array lookups rather
//! than hash probes. Values live in a sparse slot array published through an
//! atomic pointer: readers never lock, writers serialize per store.
//!
//! # Quick Start
//!
//! ```
//! use tagstore::{Tag, TagStore};
//!
//! let store = TagStore::new();
//!
//! // Typed tags round-trip their value
//! let name = Tag::string("custom_name");
//! store.set(&name, "Steve".to_string());
//! assert_eq!(store.get(&name), Some("Steve".to_string()));
//!
//! // Path tags address nested sub-namespaces, created on demand
//! let damage = Tag::int("Damage").at_path(["display"]);
//! store.set(&damage, 7);
//!
//! // The whole store collapses into a structured tree
//! let tree = store.as_tree();
//! assert!(tree.get("display").is_some());
//! ```
//!
//! # Architecture
//!
//! - [`tagstore_core`] defines the tree value model ([`TreeValue`],
//!   [`Compound`]) and conversion errors.
//! - [`tagstore_store`] implements the store itself: descriptors, the slot
//!   registry, the concurrent container and snapshots.
//!
//! This crate re-exports the public surface of both.

pub use tagstore_core::{Compound, CompoundBuilder, Result, TagError, TreeValue};
pub use tagstore_store::{PathSegment, Tag, TagReadable, TagSnapshot, TagStore};
