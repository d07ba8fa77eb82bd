//! Global string table backing [`Symbol`](super::Symbol).
//!
//! The table is a pair of concurrent maps: name to index for interning,
//! index to name for resolution. Strings are leaked on first interning so
//! handles can hand out `&'static str` without lifetime plumbing. The
//! compiler itself is single-threaded; the concurrent maps keep the table
//! safe to reach from tests running in parallel.

use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::LazyLock;

/// Process-wide string table, initialized on first use.
pub(super) static STRING_TABLE: LazyLock<StringTable> = LazyLock::new(StringTable::new);

pub(super) struct StringTable {
    /// Interned string to its index.
    by_name: DashMap<&'static str, u32, RandomState>,

    /// Index back to the interned string.
    by_index: DashMap<u32, &'static str, RandomState>,

    /// Next free index.
    next_index: AtomicU32,
}

impl StringTable {
    fn new() -> Self {
        Self {
            by_name: DashMap::with_capacity_and_hasher(256, RandomState::new()),
            by_index: DashMap::with_capacity_and_hasher(256, RandomState::new()),
            next_index: AtomicU32::new(0),
        }
    }

    /// Intern `name`, returning a stable index.
    pub(super) fn intern(&self, name: &str) -> u32 {
        if let Some(idx) = self.by_name.get(name) {
            return *idx;
        }

        let leaked: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let idx = *self
            .by_name
            .entry(leaked)
            .or_insert_with(|| self.next_index.fetch_add(1, Ordering::Relaxed));
        self.by_index.insert(idx, leaked);
        idx
    }

    /// Resolve an index back to its string.
    ///
    /// Indices only come from [`intern`](Self::intern), so a miss means a
    /// corrupted handle; the empty string keeps resolution total.
    pub(super) fn resolve(&self, idx: u32) -> &'static str {
        self.by_index.get(&idx).map(|entry| *entry).unwrap_or("")
    }
}
