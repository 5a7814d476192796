//! Compile-time tunables (spec §6.4)

/// Fixed block size: 64 KiB
pub const BLOCK_SIZE: u32 = 64 * 1024;

/// Maximum size of a single part file: 2 GiB
pub const PART_MAX: u64 = 2 * 1024 * 1024 * 1024;

/// Number of blocks prefetched ahead of a sequential read
pub const PREFETCH_WINDOW: u64 = 4;

/// Default prefetch worker pool size
pub const PREFETCH_WORKERS: usize = 4;

/// Default capacity of the eviction policy, in blocks
pub const CACHE_BLOCKS_CAPACITY: usize = 200_000;

/// Default timeout for the time-based eviction policy variant, in seconds
pub const CACHE_TIMEOUT_SECS: u64 = 3600;
