//! Block Store (spec §4.2)
//!
//! A sharded collection of per-fingerprint "part" files. Each part holds up
//! to `part_max` bytes of an object at a fixed offset; blocks never span a
//! part boundary (`block_size` divides `part_max`). Positioned reads/writes
//! go straight through `pread`/`pwrite` — there is no page cache of our own
//! here, the OS page cache already does that job for ordinary files.
//!
//! This store does not track which blocks are dirty; that bookkeeping is
//! the Metadata Store's (bitmap files live alongside part files on disk but
//! are owned by `cachefs-meta`).

mod layout;

pub use layout::{bitmap_path, part_path, shard_dir, shard_path, split_offset};

use cachefs_common::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::PathBuf;

/// Outcome of deleting every on-disk file for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Every part/bitmap file (and the now-empty shard dirs, where possible)
    /// was removed.
    Ok,
    /// At least one file could not be removed; the object's data may be
    /// only partially gone.
    Partial,
}

/// Sharded on-disk block store.
pub struct BlockStore {
    root: PathBuf,
    block_size: u32,
    part_max: u64,
}

impl BlockStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, block_size: u32, part_max: u64) -> Self {
        Self {
            root: root.into(),
            block_size,
            part_max,
        }
    }

    #[must_use]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    #[must_use]
    pub fn part_max(&self) -> u64 {
        self.part_max
    }

    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Read up to `len` bytes at `offset` into `buf`.
    ///
    /// A part file that does not exist at all is a [`Error::NotFound`] —
    /// the caller (the Cache Manager) treats that the same as any other
    /// miss. A part file that exists but is shorter than `offset` yields
    /// `Ok(0)`; a read that runs past the end of an existing part returns
    /// a short read rather than an error.
    pub fn read(&self, fp: &str, buf: &mut [u8], len: usize, offset: u64) -> Result<usize> {
        let len = len.min(buf.len());
        if len == 0 {
            return Ok(0);
        }
        let (part_idx, in_part_offset) = split_offset(offset, self.part_max);
        let path = part_path(&self.root, fp, part_idx);

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found(format!("part file for {fp} part {part_idx}")));
            }
            Err(e) => return Err(e.into()),
        };

        let file_len = file.metadata()?.len();
        if in_part_offset >= file_len {
            return Ok(0);
        }

        let readable = (file_len - in_part_offset).min(len as u64) as usize;
        let n = file.read_at(&mut buf[..readable], in_part_offset)?;
        tracing::debug!(fp, part_idx, in_part_offset, n, "block store read");
        Ok(n)
    }

    /// Write up to `len` bytes from `buf` at `offset`, creating the shard
    /// directory and part file if they do not exist yet.
    ///
    /// `mark_dirty` is accepted for parity with the original write path's
    /// call site but is a no-op here — dirtiness is tracked by the
    /// Metadata Store, which the Cache Manager updates alongside this call.
    pub fn write(
        &self,
        fp: &str,
        buf: &[u8],
        len: usize,
        offset: u64,
        _mark_dirty: bool,
    ) -> Result<usize> {
        let len = len.min(buf.len());
        if len == 0 {
            return Ok(0);
        }
        let (part_idx, in_part_offset) = split_offset(offset, self.part_max);
        if in_part_offset + len as u64 > self.part_max {
            return Err(Error::invalid(format!(
                "write of {len} bytes at part offset {in_part_offset} crosses part boundary"
            )));
        }

        let dir = shard_path(&self.root, fp);
        fs::create_dir_all(&dir)?;
        let path = part_path(&self.root, fp, part_idx);
        let file = OpenOptions::new().write(true).create(true).open(&path)?;

        let n = file.write_at(&buf[..len], in_part_offset)?;
        tracing::debug!(fp, part_idx, in_part_offset, n, "block store write");
        Ok(n)
    }

    /// Remove every part and bitmap file belonging to an object, then
    /// best-effort remove the shard directory if it is now empty.
    pub fn delete_object(&self, fp: &str) -> Result<DeleteOutcome> {
        let dir = shard_path(&self.root, fp);
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(DeleteOutcome::Ok),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{fp}.");
        let mut outcome = DeleteOutcome::Ok;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(&prefix) {
                continue;
            }
            if let Err(e) = fs::remove_file(entry.path()) {
                tracing::warn!(fp, file = name, error = %e, "failed to remove block store file");
                outcome = DeleteOutcome::Partial;
            }
        }

        // Best-effort: only succeeds if the shard dir (and its parent) ended
        // up empty, which is the common case for a lightly populated shard.
        let _ = fs::remove_dir(&dir);
        if let Some(parent) = dir.parent() {
            let _ = fs::remove_dir(parent);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, BlockStore) {
        let dir = tempdir().unwrap();
        let store = BlockStore::new(dir.path(), 64 * 1024, 2 * 1024 * 1024 * 1024);
        (dir, store)
    }

    #[test]
    fn read_on_missing_part_is_not_found() {
        let (_dir, store) = store();
        let mut buf = vec![0u8; 64];
        let err = store.read("deadbeefdeadbeef", &mut buf, 64, 0).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn write_then_read_round_trips() {
        let (_dir, store) = store();
        let fp = "deadbeefdeadbeef";
        let data = vec![7u8; 4096];
        let written = store.write(fp, &data, data.len(), 0, true).unwrap();
        assert_eq!(written, data.len());

        let mut buf = vec![0u8; 4096];
        let read = store.read(fp, &mut buf, buf.len(), 0).unwrap();
        assert_eq!(read, 4096);
        assert_eq!(buf, data);
    }

    #[test]
    fn read_past_eof_of_existing_part_is_short() {
        let (_dir, store) = store();
        let fp = "deadbeefdeadbeef";
        store.write(fp, &[1, 2, 3, 4], 4, 0, true).unwrap();

        let mut buf = vec![0u8; 64];
        let n = store.read(fp, &mut buf, 64, 100).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn write_crossing_part_boundary_is_rejected() {
        let (_dir, store) = store();
        let part_max = store.part_max();
        let data = vec![1u8; 16];
        let err = store
            .write("deadbeefdeadbeef", &data, data.len(), part_max - 8, true)
            .unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));
    }

    #[test]
    fn write_at_second_part_lands_in_its_own_file() {
        let (dir, store) = store();
        let fp = "deadbeefdeadbeef";
        let part_max = store.part_max();
        store.write(fp, &[9u8; 8], 8, part_max, true).unwrap();

        let p1 = part_path(dir.path(), fp, 1);
        assert!(p1.exists());
        let p0 = part_path(dir.path(), fp, 0);
        assert!(!p0.exists());
    }

    #[test]
    fn delete_object_removes_all_part_and_bitmap_files() {
        let (dir, store) = store();
        let fp = "deadbeefdeadbeef";
        store.write(fp, &[1u8; 8], 8, 0, true).unwrap();
        fs::write(bitmap_path(dir.path(), fp, 0), [0u8; 8]).unwrap();

        let outcome = store.delete_object(fp).unwrap();
        assert_eq!(outcome, DeleteOutcome::Ok);
        assert!(!part_path(dir.path(), fp, 0).exists());
        assert!(!bitmap_path(dir.path(), fp, 0).exists());
    }

    #[test]
    fn delete_object_on_absent_shard_is_ok() {
        let (_dir, store) = store();
        let outcome = store.delete_object("0000000000000000").unwrap();
        assert_eq!(outcome, DeleteOutcome::Ok);
    }
}
