//! Eviction Policy (spec §4.4)
//!
//! Pluggable policies that decide which cached block to reclaim first. The
//! Cache Manager owns the entry table; a policy only ever sees the flat
//! ids produced by [`encode_key`].

mod key;
mod timeout;
mod weighted_lru;

pub use key::{decode_key, encode_key};
pub use timeout::TimeoutPolicy;
pub use weighted_lru::WeightedLru;

/// Common interface every eviction policy implements.
pub trait EvictionPolicy: Send {
    /// Record activity on an entry, inserting it if new.
    fn touch(&mut self, id: u64, bytes: u64, hotness: f32);

    /// Stop tracking an entry (it was deleted or flushed out independently).
    fn remove(&mut self, id: u64);

    /// Pick and stop tracking the next eviction victim, if any.
    fn evict(&mut self) -> Option<u64>;
}
