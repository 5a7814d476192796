//! In-memory cache entry table
//!
//! One record per tracked path, born lazily on first touch and never
//! removed once evicted — a later access to the same path sees
//! `evicted == true` via [`super::CacheManager::has_valid_entry`] rather
//! than silently reviving stale state.

use std::collections::HashMap;

/// Per-path bookkeeping the Cache Manager mutates under its table lock.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub entry_id: u32,
    pub fingerprint: String,
    pub last_block: Option<u64>,
    pub evicted: bool,
}

/// Immutable copy of an entry's state, safe to hand to a prefetch job that
/// must not touch the Cache Manager's lock.
#[derive(Clone, Debug)]
pub struct CacheEntrySnapshot {
    pub entry_id: u32,
    pub path: String,
    pub fingerprint: String,
    pub last_block: Option<u64>,
    pub evicted: bool,
}

#[derive(Default)]
pub struct EntryTable {
    pub by_path: HashMap<String, CacheEntry>,
    pub by_id: HashMap<u32, String>,
    next_id: u32,
}

impl EntryTable {
    /// Return the existing entry for `path`, or create a fresh `Live` one.
    ///
    /// Does not revive an evicted entry — callers check `entry.evicted`
    /// themselves, since "not found" and "evicted" are distinguishable
    /// outcomes the Cache Manager reports differently.
    pub fn resolve_or_create(&mut self, path: &str) -> &mut CacheEntry {
        if !self.by_path.contains_key(path) {
            let id = self.next_id;
            self.next_id += 1;
            let fingerprint = cachefs_hash::fingerprint(path);
            self.by_id.insert(id, path.to_string());
            self.by_path.insert(
                path.to_string(),
                CacheEntry {
                    entry_id: id,
                    fingerprint,
                    last_block: None,
                    evicted: false,
                },
            );
        }
        self.by_path.get_mut(path).expect("just inserted or present")
    }
}
