//! CacheFS Common - shared types and utilities
//!
//! Error types, tunables, and configuration shared across the cache core
//! crates (hash, block store, metadata store, eviction, prefetch, backend,
//! manager).

pub mod config;
pub mod error;
pub mod tunables;

pub use config::{BlockConfig, CacheConfig, EvictionConfig, EvictionKind, PrefetchConfig};
pub use error::{Error, Result};
pub use tunables::*;
