//! Cache Manager (spec §4.6) — the central subsystem
//!
//! Fuses the Path Hasher, Block Store, Metadata Store, Eviction Policy, and
//! Prefetch Pool behind a read/write path a filesystem adapter calls into.
//! A single mutex guards the entry table and serialises foreground I/O;
//! that is an acceptable baseline per the concurrency model this is built
//! against, not an oversight — most latency here is in the backend and the
//! block store, not in table bookkeeping.

mod entry;
mod stats;

pub use entry::{CacheEntry, CacheEntrySnapshot};
pub use stats::CacheStats;

use cachefs_backend::{LocalMirrorBackend, ObjectBackend};
use cachefs_block::BlockStore;
use cachefs_common::{CacheConfig, Error, Result};
use cachefs_evict::{decode_key, encode_key, EvictionPolicy, TimeoutPolicy, WeightedLru};
use cachefs_meta::{MetadataStore, ObjectRow};
use cachefs_prefetch::PrefetchPool;
use entry::EntryTable;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CacheManager {
    table: Mutex<EntryTable>,
    stats: CacheStats,
    block_store: Arc<BlockStore>,
    meta_store: Arc<MetadataStore>,
    policy: Arc<Mutex<Box<dyn EvictionPolicy>>>,
    prefetch: PrefetchPool,
    backend: Arc<dyn ObjectBackend>,
    mirror: Arc<LocalMirrorBackend>,
    cache_root: PathBuf,
    block_size: u32,
    part_max: u64,
    prefetch_window: u64,
}

impl CacheManager {
    pub fn new(
        cache_root: impl Into<PathBuf>,
        backend: Arc<dyn ObjectBackend>,
        config: CacheConfig,
    ) -> Result<Self> {
        let cache_root = cache_root.into();
        std::fs::create_dir_all(&cache_root)?;

        let block_store = BlockStore::new(&cache_root, config.block.block_size, config.block.part_max);
        let meta_store = MetadataStore::open(&cache_root)?;
        let mirror = LocalMirrorBackend::new(&cache_root);

        let policy: Box<dyn EvictionPolicy> = match config.eviction.kind {
            cachefs_common::EvictionKind::WeightedLru => {
                Box::new(WeightedLru::new(config.eviction.capacity_blocks))
            }
            cachefs_common::EvictionKind::TimeBased => Box::new(TimeoutPolicy::new(
                std::time::Duration::from_secs(config.eviction.timeout_secs),
            )),
        };

        Ok(Self {
            table: Mutex::new(EntryTable::default()),
            stats: CacheStats::default(),
            block_store: Arc::new(block_store),
            meta_store: Arc::new(meta_store),
            policy: Arc::new(Mutex::new(policy)),
            prefetch: PrefetchPool::new(config.prefetch.workers),
            backend,
            mirror: Arc::new(mirror),
            cache_root,
            block_size: config.block.block_size,
            part_max: config.block.part_max,
            prefetch_window: config.prefetch.window,
        })
    }

    /// Read `len` bytes at `offset` into `buf`, fetching through the
    /// backend (or, failing that, the local mirror) on a miss.
    pub fn read(&self, path: &str, buf: &mut [u8], len: usize, offset: u64) -> Result<i64> {
        let len = len.min(buf.len());
        if len == 0 {
            return Ok(0);
        }

        let mut table = self.table.lock();
        {
            let existing = table.by_path.get(path);
            if existing.is_some_and(|e| e.evicted) {
                return Err(Error::not_found(path.to_string()));
            }
        }
        let entry = table.resolve_or_create(path);
        let entry_id = entry.entry_id;
        let fingerprint = entry.fingerprint.clone();

        let block_size = u64::from(self.block_size);
        let first_block = offset / block_size;
        let last_block = (offset + len as u64 - 1) / block_size;
        let mut tmp = vec![0u8; self.block_size as usize];
        let mut delivered = 0usize;

        for b in first_block..=last_block {
            let block_off = b * block_size;

            let hit = matches!(
                self.block_store.read(&fingerprint, &mut tmp, self.block_size as usize, block_off),
                Ok(n) if n == self.block_size as usize
            );

            if hit {
                self.stats.record_hit();
            } else {
                self.stats.record_miss();
                let mut got = self
                    .backend
                    .get_range(path, &mut tmp, self.block_size as usize, block_off)
                    .unwrap_or(-1);
                if got <= 0 {
                    got = self
                        .mirror
                        .get_range(path, &mut tmp, self.block_size as usize, block_off)
                        .unwrap_or(-1);
                }
                if got <= 0 {
                    return if delivered > 0 {
                        Ok(delivered as i64)
                    } else {
                        Err(Error::not_found(path.to_string()))
                    };
                }
                self.block_store
                    .write(&fingerprint, &tmp, got as usize, block_off, false)?;
            }

            let range_start = block_off.max(offset);
            let range_end = (block_off + block_size).min(offset + len as u64);
            if range_end > range_start {
                let in_block = (range_start - block_off) as usize;
                let copy_len = (range_end - range_start) as usize;
                let dest = (range_start - offset) as usize;
                buf[dest..dest + copy_len].copy_from_slice(&tmp[in_block..in_block + copy_len]);
                delivered += copy_len;
            }

            self.policy
                .lock()
                .touch(encode_key(entry_id, b as u32), block_size, 1.0);

            let was_sequential = entry.last_block.is_some_and(|lb| b == lb + 1);
            entry.last_block = Some(b);

            if was_sequential {
                let snapshot = CacheEntrySnapshot {
                    entry_id,
                    path: path.to_string(),
                    fingerprint: fingerprint.clone(),
                    last_block: Some(b),
                    evicted: false,
                };
                self.schedule_prefetch(snapshot, b + 1);
            }
        }

        Ok(delivered as i64)
    }

    /// Write `len` bytes from `buf` at `offset`, always read-modify-writing
    /// full blocks so a later full-length read hits.
    pub fn write(&self, path: &str, buf: &[u8], len: usize, offset: u64) -> Result<i64> {
        let len = len.min(buf.len());
        if len == 0 {
            return Ok(0);
        }

        let mut table = self.table.lock();
        {
            let existing = table.by_path.get(path);
            if existing.is_some_and(|e| e.evicted) {
                return Err(Error::not_found(path.to_string()));
            }
        }
        let entry = table.resolve_or_create(path);
        let entry_id = entry.entry_id;
        let fingerprint = entry.fingerprint.clone();

        let block_size = u64::from(self.block_size);
        let first_block = offset / block_size;
        let last_block = (offset + len as u64 - 1) / block_size;
        let mut tmp = vec![0u8; self.block_size as usize];

        for b in first_block..=last_block {
            let block_off = b * block_size;

            match self.block_store.read(&fingerprint, &mut tmp, self.block_size as usize, block_off) {
                Ok(n) if n == tmp.len() => {}
                Ok(n) => tmp[n..].fill(0),
                Err(_) => tmp.fill(0),
            }

            let range_start = block_off.max(offset);
            let range_end = (block_off + block_size).min(offset + len as u64);
            let in_block = (range_start - block_off) as usize;
            let copy_len = (range_end - range_start) as usize;
            let src = (range_start - offset) as usize;
            tmp[in_block..in_block + copy_len].copy_from_slice(&buf[src..src + copy_len]);

            self.block_store
                .write(&fingerprint, &tmp, tmp.len(), block_off, true)?;
            self.meta_store
                .mark_dirty_block(&fingerprint, block_off / self.part_max, b);
            self.policy
                .lock()
                .touch(encode_key(entry_id, b as u32), block_size, 1.0);
        }

        drop(table);

        self.update_row_after_write(path, offset, len as u64);
        // Best-effort write-through; kept off the table lock per the mirror's
        // optional, non-critical-path status.
        let _ = self.mirror.put_range(path, buf, len, offset);

        Ok(len as i64)
    }

    fn update_row_after_write(&self, path: &str, offset: u64, len: u64) {
        let now = now_unix();
        let existing = self.meta_store.get(path);
        let size = existing.as_ref().map_or(0, |r| r.size).max(offset + len);
        let created_at = existing.map_or(now, |r| r.created_at);
        self.meta_store.put(&ObjectRow {
            path: path.to_string(),
            local_path: path.to_string(),
            size,
            created_at,
            last_accessed: now,
            dirty: true,
        });
    }

    fn schedule_prefetch(&self, snapshot: CacheEntrySnapshot, first_block: u64) {
        let block_store = Arc::clone(&self.block_store);
        let backend = Arc::clone(&self.backend);
        let policy = Arc::clone(&self.policy);
        let block_size = self.block_size;
        let window = self.prefetch_window;

        self.prefetch.enqueue(move || {
            let mut tmp = vec![0u8; block_size as usize];
            for i in 0..window {
                let b = first_block + i;
                let off = b * u64::from(block_size);

                let already_cached = matches!(
                    block_store.read(&snapshot.fingerprint, &mut tmp, block_size as usize, off),
                    Ok(n) if n == block_size as usize
                );
                if already_cached {
                    continue;
                }

                if let Ok(got) = backend.get_range(&snapshot.path, &mut tmp, block_size as usize, off) {
                    if got > 0 {
                        let _ = block_store.write(&snapshot.fingerprint, &tmp, got as usize, off, false);
                        policy
                            .lock()
                            .touch(encode_key(snapshot.entry_id, b as u32), u64::from(block_size), 0.25);
                    }
                }
            }
        });
    }

    /// Persist every tracked entry's in-memory dirty bitmaps. Does not
    /// upload dirty blocks — uploading on flush is a write-back policy
    /// outside this core's scope.
    pub fn flush_all(&self) {
        let table = self.table.lock();
        for entry in table.by_path.values() {
            if let Err(e) = self.meta_store.flush_bitmaps(&entry.fingerprint) {
                tracing::warn!(fingerprint = %entry.fingerprint, error = %e, "failed to flush bitmaps");
            }
        }
    }

    /// Evict entries until the cache's on-disk block data is at or below
    /// `target_gb`. Never evicts an entry with unflushed dirty blocks.
    pub fn evict_until_gb(&self, target_gb: f64) {
        let target_bytes = (target_gb * f64::from(1u32 << 30)) as u64;

        loop {
            if self.block_bytes_on_disk() <= target_bytes {
                break;
            }
            let Some(key) = self.policy.lock().evict() else {
                break;
            };
            let (entry_id, _block_idx) = decode_key(key);

            let path = {
                let table = self.table.lock();
                table.by_id.get(&entry_id).cloned()
            };
            let Some(path) = path else { continue };

            if self.meta_store.get(&path).is_some_and(|r| r.dirty) {
                tracing::debug!(path, "refusing to evict dirty entry");
                continue;
            }

            let fingerprint = {
                let mut table = self.table.lock();
                let Some(entry) = table.by_path.get_mut(&path) else {
                    continue;
                };
                if entry.evicted {
                    continue;
                }
                entry.evicted = true;
                entry.fingerprint.clone()
            };

            let _ = self.block_store.delete_object(&fingerprint);
            let _ = self.meta_store.flush_bitmaps(&fingerprint);
            self.meta_store.clear_bitmaps(&fingerprint);
        }
    }

    fn block_bytes_on_disk(&self) -> u64 {
        fn walk(dir: &Path, total: &mut u64) {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    walk(&path, total);
                } else if path.extension().is_some_and(|ext| ext == "blk") {
                    if let Ok(meta) = entry.metadata() {
                        *total += meta.len();
                    }
                }
            }
        }

        let mut total = 0;
        walk(&self.cache_root, &mut total);
        total
    }

    #[must_use]
    pub fn has_valid_entry(&self, path: &str) -> bool {
        self.table
            .lock()
            .by_path
            .get(path)
            .is_some_and(|e| !e.evicted)
    }

    #[must_use]
    pub fn get_entry(&self, path: &str) -> Option<CacheEntrySnapshot> {
        let table = self.table.lock();
        let entry = table.by_path.get(path)?;
        Some(CacheEntrySnapshot {
            entry_id: entry.entry_id,
            path: path.to_string(),
            fingerprint: entry.fingerprint.clone(),
            last_block: entry.last_block,
            evicted: entry.evicted,
        })
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    #[must_use]
    pub fn cache_hits(&self) -> u64 {
        self.stats.hits()
    }

    #[must_use]
    pub fn cache_misses(&self) -> u64 {
        self.stats.misses()
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
