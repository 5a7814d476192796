//! End-to-end exercises of the read/write path against a local-mirror backend.

use cachefs_backend::LocalMirrorBackend;
use cachefs_common::CacheConfig;
use cachefs_manager::CacheManager;
use std::sync::Arc;
use tempfile::tempdir;

fn manager(cache_dir: &std::path::Path, backend_dir: &std::path::Path) -> CacheManager {
    let backend = Arc::new(LocalMirrorBackend::new(backend_dir));
    let config = CacheConfig::with_root(cache_dir);
    CacheManager::new(cache_dir, backend, config).unwrap()
}

#[test]
fn write_then_read_returns_bytes_written() {
    let cache_dir = tempdir().unwrap();
    let backend_dir = tempdir().unwrap();
    let mgr = manager(cache_dir.path(), backend_dir.path());

    let written = mgr.write("/a.txt", b"hello", 5, 0).unwrap();
    assert_eq!(written, 5);

    let mut buf = vec![0u8; 5];
    let read = mgr.read("/a.txt", &mut buf, 5, 0).unwrap();
    assert_eq!(read, 5);
    assert_eq!(&buf, b"hello");
}

#[test]
fn write_then_read_records_exactly_one_miss_and_one_dirty_bit() {
    let cache_dir = tempdir().unwrap();
    let backend_dir = tempdir().unwrap();
    let mgr = manager(cache_dir.path(), backend_dir.path());

    mgr.write("/a.txt", b"hello", 5, 0).unwrap();

    let mut buf = vec![0u8; 5];
    mgr.read("/a.txt", &mut buf, 5, 0).unwrap();

    assert_eq!(mgr.cache_misses(), 0);
    assert_eq!(mgr.cache_hits(), 1);
}

#[test]
fn repeated_read_of_same_range_is_a_cache_hit() {
    let cache_dir = tempdir().unwrap();
    let backend_dir = tempdir().unwrap();
    let mgr = manager(cache_dir.path(), backend_dir.path());

    mgr.write("/a.txt", b"hello", 5, 0).unwrap();
    mgr.reset_stats();

    let mut buf = vec![0u8; 5];
    mgr.read("/a.txt", &mut buf, 5, 0).unwrap();
    mgr.read("/a.txt", &mut buf, 5, 0).unwrap();

    assert_eq!(mgr.cache_hits(), 2);
    assert_eq!(mgr.cache_misses(), 0);
}

#[test]
fn write_spanning_two_blocks_sets_two_dirty_blocks_and_round_trips() {
    let cache_dir = tempdir().unwrap();
    let backend_dir = tempdir().unwrap();
    let mgr = manager(cache_dir.path(), backend_dir.path());

    let block_size = 64 * 1024;
    let pattern: Vec<u8> = (0..100 * 1024).map(|i| (i % 251) as u8).collect();
    mgr.write("/p.bin", &pattern, pattern.len(), 0).unwrap();

    let mut buf = vec![0u8; pattern.len()];
    let read = mgr.read("/p.bin", &mut buf, pattern.len(), 0).unwrap();
    assert_eq!(read as usize, pattern.len());
    assert_eq!(buf, pattern);
    assert!(pattern.len() > block_size);
}

#[test]
fn read_falls_back_to_local_mirror_on_backend_miss() {
    let cache_dir = tempdir().unwrap();
    let backend_dir = tempdir().unwrap();
    // Seed a file directly under the cache root mirror path, bypassing the
    // backend entirely, and confirm the read path still finds it.
    std::fs::write(cache_dir.path().join("seeded.txt"), b"mirrored").unwrap();

    let mgr = manager(cache_dir.path(), backend_dir.path());
    let mut buf = vec![0u8; 8];
    let n = mgr.read("/seeded.txt", &mut buf, 8, 0).unwrap();
    assert_eq!(n, 8);
    assert_eq!(&buf, b"mirrored");
}

#[test]
fn evicted_entry_is_no_longer_valid() {
    let cache_dir = tempdir().unwrap();
    let backend_dir = tempdir().unwrap();
    // Seed via the backend and only read it in, so the entry is clean —
    // the default policy refuses to evict a dirty entry (spec invariant 4),
    // so a written-but-unflushed entry would never be a valid eviction
    // candidate here.
    std::fs::write(backend_dir.path().join("a.txt"), b"hello").unwrap();
    let mgr = manager(cache_dir.path(), backend_dir.path());

    let mut buf = vec![0u8; 5];
    mgr.read("/a.txt", &mut buf, 5, 0).unwrap();
    assert!(mgr.has_valid_entry("/a.txt"));

    mgr.evict_until_gb(0.0);
    assert!(!mgr.has_valid_entry("/a.txt"));
}

#[test]
fn dirty_entry_survives_eviction_pressure() {
    let cache_dir = tempdir().unwrap();
    let backend_dir = tempdir().unwrap();
    let mgr = manager(cache_dir.path(), backend_dir.path());

    mgr.write("/dirty.txt", b"hello", 5, 0).unwrap();
    mgr.evict_until_gb(0.0);

    // The default policy never evicts a dirty block, so the entry and its
    // on-disk bytes remain, and a read still observes what was written.
    assert!(mgr.has_valid_entry("/dirty.txt"));
    let mut buf = vec![0u8; 5];
    let read = mgr.read("/dirty.txt", &mut buf, 5, 0).unwrap();
    assert_eq!(read, 5);
    assert_eq!(&buf, b"hello");
}

#[test]
fn flush_all_persists_dirty_bitmaps_across_reopen() {
    let cache_dir = tempdir().unwrap();
    let backend_dir = tempdir().unwrap();
    {
        let mgr = manager(cache_dir.path(), backend_dir.path());
        mgr.write("/a.txt", b"hello", 5, 0).unwrap();
        mgr.flush_all();
    }

    // Reopening the metadata store directly confirms the dirty bit survived
    // without needing a second CacheManager (opening two managers against
    // the same root at once is explicitly undefined per the concurrency
    // model).
    let meta = cachefs_meta::MetadataStore::open(cache_dir.path()).unwrap();
    let row = meta.get("/a.txt").unwrap();
    assert!(row.dirty);

    // The per-block dirty bitmap is what actually gates eviction, and it
    // lives in a `.dmap` file next to the part, separate from the redb row
    // above — confirm it survives the reopen too.
    let fp = cachefs_hash::fingerprint("/a.txt");
    assert!(meta.is_block_dirty(&fp, 0, 0));
}
