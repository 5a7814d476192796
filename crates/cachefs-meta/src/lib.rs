//! Metadata Store (spec §4.3)
//!
//! Persists one row per cached object (path, local part-file root, size,
//! timestamps, dirty flag) in an embedded `redb` table, and tracks which
//! blocks within each part are dirty via an in-memory bitmap mirrored to a
//! `.dmap` file beside the part's data. `redb` stands in for the SQLite
//! table the original metadata store used — same embedded single-file
//! B-tree role, no server process.

mod bitmap;
mod row;
mod tables;

pub use bitmap::Bitmap;
pub use row::ObjectRow;

use cachefs_block::bitmap_path;
use cachefs_common::{Error, Result};
use dashmap::DashMap;
use redb::{Database, ReadableTable};
use std::path::PathBuf;
use tables::OBJECTS;

const DB_FILE_NAME: &str = "cache_meta.db";

/// Metadata store: object rows plus per-part dirty bitmaps.
pub struct MetadataStore {
    db: Database,
    bitmaps: DashMap<(String, u64), Bitmap>,
    root: PathBuf,
}

impl MetadataStore {
    /// Open (creating if absent) the metadata database under `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let db = Database::create(root.join(DB_FILE_NAME))
            .map_err(|e| Error::storage(format!("opening metadata database: {e}")))?;

        // Touch the table so a fresh database always has it, matching the
        // original store's CREATE TABLE IF NOT EXISTS at init time.
        let txn = db
            .begin_write()
            .map_err(|e| Error::storage(format!("beginning metadata transaction: {e}")))?;
        {
            txn.open_table(OBJECTS)
                .map_err(|e| Error::storage(format!("opening objects table: {e}")))?;
        }
        txn.commit()
            .map_err(|e| Error::storage(format!("committing metadata transaction: {e}")))?;

        Ok(Self {
            db,
            bitmaps: DashMap::new(),
            root,
        })
    }

    /// Look up an object's row by path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<ObjectRow> {
        let txn = self.db.begin_read().ok()?;
        let table = txn.open_table(OBJECTS).ok()?;
        let guard = table.get(path).ok()??;
        bincode::deserialize(guard.value()).ok()
    }

    /// Insert or replace a row. Returns `true` on success.
    pub fn put(&self, row: &ObjectRow) -> bool {
        let Ok(bytes) = bincode::serialize(row) else {
            return false;
        };
        self.with_write_table(|table| {
            table
                .insert(row.path.as_str(), bytes.as_slice())
                .map_err(|e| Error::storage(e.to_string()))?;
            Ok(())
        })
    }

    /// Update `last_accessed` on an existing row; no-op if the row is absent.
    pub fn touch(&self, path: &str, t: u64) -> bool {
        let Some(mut row) = self.get(path) else {
            return false;
        };
        row.last_accessed = t;
        self.put(&row)
    }

    /// Set the dirty flag on an existing row; no-op if the row is absent.
    pub fn mark_dirty(&self, path: &str, dirty: bool) -> bool {
        let Some(mut row) = self.get(path) else {
            return false;
        };
        row.dirty = dirty;
        self.put(&row)
    }

    /// Delete a row. Returns `true` if a row was actually removed.
    pub fn remove(&self, path: &str) -> bool {
        self.with_write_table(|table| {
            table.remove(path).map_err(|e| Error::storage(e.to_string()))?;
            Ok(())
        })
    }

    /// All rows currently stored, in no particular order.
    #[must_use]
    pub fn all_entries(&self) -> Vec<ObjectRow> {
        let Ok(txn) = self.db.begin_read() else {
            return Vec::new();
        };
        let Ok(table) = txn.open_table(OBJECTS) else {
            return Vec::new();
        };
        let Ok(iter) = table.iter() else {
            return Vec::new();
        };
        iter.filter_map(std::result::Result::ok)
            .filter_map(|(_, v)| bincode::deserialize(v.value()).ok())
            .collect()
    }

    /// Drop every row and all in-memory dirty bitmaps. Mirrors the original
    /// store's `cleanup()`, which dropped its whole table at shutdown.
    pub fn cleanup(&self) -> bool {
        self.bitmaps.clear();
        self.with_write_table(|table| {
            let keys: Vec<String> = table
                .iter()
                .map_err(|e| Error::storage(e.to_string()))?
                .filter_map(std::result::Result::ok)
                .map(|(k, _)| k.value().to_string())
                .collect();
            for key in keys {
                table
                    .remove(key.as_str())
                    .map_err(|e| Error::storage(e.to_string()))?;
            }
            Ok(())
        })
    }

    /// Mark one block within a part dirty (in memory only; call
    /// [`Self::flush_bitmaps`] to persist).
    pub fn mark_dirty_block(&self, fp: &str, part_idx: u64, block_idx: u64) {
        self.load_bitmap(fp, part_idx).set(block_idx);
    }

    /// Whether a given block within a part is marked dirty.
    #[must_use]
    pub fn is_block_dirty(&self, fp: &str, part_idx: u64, block_idx: u64) -> bool {
        self.load_bitmap(fp, part_idx).get(block_idx)
    }

    /// Entry for `(fp, part_idx)`'s in-memory bitmap, lazily populated from
    /// its `.dmap` file the first time this part is touched after process
    /// start — a file that does not exist yet yields an empty bitmap.
    fn load_bitmap(&self, fp: &str, part_idx: u64) -> dashmap::mapref::one::RefMut<'_, (String, u64), Bitmap> {
        self.bitmaps.entry((fp.to_string(), part_idx)).or_insert_with(|| {
            let path = bitmap_path(&self.root, fp, part_idx);
            Bitmap::from_bytes(std::fs::read(path).unwrap_or_default())
        })
    }

    /// Persist every in-memory bitmap for `fp` to its `.dmap` file.
    pub fn flush_bitmaps(&self, fp: &str) -> Result<()> {
        for entry in &self.bitmaps {
            let (entry_fp, part_idx) = entry.key();
            if entry_fp != fp {
                continue;
            }
            let path = bitmap_path(&self.root, fp, *part_idx);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, entry.value().as_bytes())?;
        }
        Ok(())
    }

    /// Drop every in-memory bitmap for `fp` (after a successful flush to the
    /// backend, the object is no longer dirty).
    pub fn clear_bitmaps(&self, fp: &str) {
        self.bitmaps.retain(|(entry_fp, _), _| entry_fp != fp);
    }

    fn with_write_table(&self, f: impl FnOnce(&mut redb::Table<&str, &[u8]>) -> Result<()>) -> bool {
        let Ok(txn) = self.db.begin_write() else {
            return false;
        };
        let ok = {
            let Ok(mut table) = txn.open_table(OBJECTS) else {
                return false;
            };
            f(&mut table).is_ok()
        };
        ok && txn.commit().is_ok()
    }
}
