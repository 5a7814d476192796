//! Local-mirror object backend
//!
//! Treats a directory on the same machine as the remote object space —
//! `file://` in the original design. Useful for tests and for deployments
//! where the "remote" store is really a shared NFS/network mount rather
//! than an HTTP service.

use crate::ObjectBackend;
use cachefs_common::{Error, Result};
use std::fs::{self, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::PathBuf;

pub struct LocalMirrorBackend {
    root: PathBuf,
}

impl LocalMirrorBackend {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl ObjectBackend for LocalMirrorBackend {
    fn get_range(&self, path: &str, buf: &mut [u8], len: usize, offset: u64) -> Result<i64> {
        let len = len.min(buf.len());
        let full = self.resolve(path);
        let file = match fs::File::open(&full) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let file_len = file.metadata()?.len();
        if offset >= file_len {
            return Ok(0);
        }
        let readable = ((file_len - offset) as usize).min(len);
        let n = file.read_at(&mut buf[..readable], offset)?;
        Ok(n as i64)
    }

    fn put_range(&self, path: &str, buf: &[u8], len: usize, offset: u64) -> Result<i64> {
        let len = len.min(buf.len());
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().write(true).create(true).open(&full)?;
        let n = file.write_at(&buf[..len], offset)?;
        Ok(n as i64)
    }

    fn delete(&self, path: &str) -> Result<i64> {
        let full = self.resolve(path);
        match fs::remove_file(&full) {
            Ok(()) => Ok(0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
