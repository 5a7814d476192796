//! Error types for the cache core
//!
//! Mirrors the error kinds described for the core's error handling design:
//! `NotFound`, `Io`, `NoDevice`, `Invalid`, `Unsupported`.

use thiserror::Error;

/// Result type used throughout the cache core
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds surfaced by the cache core
#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache not initialized: {0}")]
    NoDevice(String),

    #[error("invalid argument: {0}")]
    Invalid(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    #[must_use]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    #[must_use]
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    #[must_use]
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Map to the POSIX errno a filesystem adapter should surface to the
    /// kernel. The mapping itself lives here; actually wiring it into
    /// upcall return codes is the adapter's job.
    #[must_use]
    pub fn errno(&self) -> i32 {
        match self {
            Self::NotFound(_) => libc_like::ENOENT,
            Self::Io(_) | Self::Storage(_) | Self::Backend(_) => libc_like::EIO,
            Self::NoDevice(_) => libc_like::ENODEV,
            Self::Invalid(_) => libc_like::EINVAL,
            Self::Unsupported(_) => libc_like::ENOSYS,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Numeric errno values, kept local so this crate does not need to depend on
/// `libc` just to name five constants (the filesystem adapter that actually
/// returns these to the kernel owns that dependency).
mod libc_like {
    pub const ENOENT: i32 = 2;
    pub const EIO: i32 = 5;
    pub const ENODEV: i32 = 19;
    pub const EINVAL: i32 = 22;
    pub const ENOSYS: i32 = 38;
}
