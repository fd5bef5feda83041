//! Process-wide slot index registry
//!
//! Every distinct key name is interned to a stable integer slot index for the
//! lifetime of the process. Assignment happens once, on first use, and is
//! never reset; two descriptors created for the same logical key always
//! address the same slot, even when their value types differ. That is what
//! lets a consumer read a key under a different but structurally compatible
//! descriptor than the one it was written with.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU32, Ordering};

static INDEXES: Lazy<DashMap<String, u32>> = Lazy::new(DashMap::new);
static NEXT_INDEX: AtomicU32 = AtomicU32::new(0);

/// Resolve the stable slot index for a key name, interning it on first use
pub(crate) fn slot_index_for(key: &str) -> u32 {
    if let Some(index) = INDEXES.get(key) {
        return *index;
    }
    // The shard lock held by `entry` makes assignment race-free; the counter
    // may skip values when two threads intern different keys concurrently,
    // which is fine since only uniqueness and stability matter.
    *INDEXES
        .entry(key.to_string())
        .or_insert_with(|| NEXT_INDEX.fetch_add(1, Ordering::Relaxed))
}
