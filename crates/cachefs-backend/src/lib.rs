//! Object Backend (spec §6.1) — out of the cache core proper, but this is
//! the collaborator contract the Cache Manager programs against.

mod http;
mod info;
mod local_mirror;

pub use http::HttpBackend;
pub use info::ObjectInfo;
pub use local_mirror::LocalMirrorBackend;

use cachefs_common::Result;

/// Remote object space the cache absorbs reads from and flushes writes to.
pub trait ObjectBackend: Send + Sync {
    /// Read up to `len` bytes at `offset`, returning the number read.
    fn get_range(&self, path: &str, buf: &mut [u8], len: usize, offset: u64) -> Result<i64>;

    /// Write up to `len` bytes from `buf` at `offset`, returning the number
    /// written.
    fn put_range(&self, path: &str, buf: &[u8], len: usize, offset: u64) -> Result<i64>;

    /// Remove an object entirely.
    fn delete(&self, path: &str) -> Result<i64>;
}
