//! Configuration types for the cache core
//!
//! Mirrors the nested `*Config` + `Default` shape used across the pack this
//! crate is modeled on. There is deliberately no file/env loader here: that
//! belongs to the CLI/adapter layer, which is out of scope for this core.

use crate::tunables::{
    BLOCK_SIZE, CACHE_BLOCKS_CAPACITY, CACHE_TIMEOUT_SECS, PART_MAX, PREFETCH_WINDOW,
    PREFETCH_WORKERS,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for a `CacheManager` instance
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory the sharded block store, metadata store, and write-through
    /// mirror all live under
    pub cache_root: PathBuf,
    pub block: BlockConfig,
    pub eviction: EvictionConfig,
    pub prefetch: PrefetchConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from("./cache"),
            block: BlockConfig::default(),
            eviction: EvictionConfig::default(),
            prefetch: PrefetchConfig::default(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: root.into(),
            ..Self::default()
        }
    }
}

/// Block/part sizing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockConfig {
    pub block_size: u32,
    pub part_max: u64,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            part_max: PART_MAX,
        }
    }
}

/// Eviction policy selection and sizing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvictionConfig {
    pub capacity_blocks: usize,
    pub kind: EvictionKind,
    /// Only consulted when `kind == TimeBased`
    pub timeout_secs: u64,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            capacity_blocks: CACHE_BLOCKS_CAPACITY,
            kind: EvictionKind::WeightedLru,
            timeout_secs: CACHE_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvictionKind {
    WeightedLru,
    TimeBased,
}

/// Prefetch pool sizing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrefetchConfig {
    pub workers: usize,
    pub window: u64,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            workers: PREFETCH_WORKERS,
            window: PREFETCH_WINDOW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_json() {
        let cfg = CacheConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: CacheConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.block.block_size, back.block.block_size);
        assert_eq!(cfg.eviction.capacity_blocks, back.eviction.capacity_blocks);
    }

    #[test]
    fn with_root_overrides_only_root() {
        let cfg = CacheConfig::with_root("/var/cache/fs");
        assert_eq!(cfg.cache_root, PathBuf::from("/var/cache/fs"));
        assert_eq!(cfg.block.block_size, BLOCK_SIZE);
    }
}
