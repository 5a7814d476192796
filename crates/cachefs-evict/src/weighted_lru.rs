//! Weighted-LRU eviction policy (spec §4.4)
//!
//! Scores each tracked entry as `bytes * (1 - hotness)` and evicts the
//! lowest-scoring one: cheap, cold entries go first, and an entry with
//! `hotness` near 1.0 is protected even if it is large. Ties break by
//! recency, same as the plain LRU this generalizes.

use crate::EvictionPolicy;
use std::collections::HashMap;

struct Tracked {
    bytes: u64,
    hotness: f32,
    seq: u64,
}

/// Weighted-LRU policy bounded to `capacity` tracked entries.
pub struct WeightedLru {
    capacity: usize,
    entries: HashMap<u64, Tracked>,
    next_seq: u64,
}

impl WeightedLru {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            next_seq: 0,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn is_over_capacity(&self) -> bool {
        self.entries.len() > self.capacity
    }

    fn score(bytes: u64, hotness: f32) -> f64 {
        (bytes as f64) * f64::from(1.0 - hotness.clamp(0.0, 1.0))
    }

    fn pick_victim(&self) -> Option<u64> {
        self.entries
            .iter()
            .map(|(id, t)| (*id, Self::score(t.bytes, t.hotness), t.seq))
            .min_by(|a, b| {
                a.1.partial_cmp(&b.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.2.cmp(&b.2))
            })
            .map(|(id, _, _)| id)
    }

    fn evict_one(&mut self) -> Option<u64> {
        let victim = self.pick_victim();
        if let Some(id) = victim {
            self.entries.remove(&id);
            tracing::debug!(id, "weighted-lru evicted entry");
        }
        victim
    }
}

impl EvictionPolicy for WeightedLru {
    fn touch(&mut self, id: u64, bytes: u64, hotness: f32) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(id, Tracked { bytes, hotness, seq });

        if self.entries.len() > self.capacity {
            self.evict_one();
        }
    }

    fn remove(&mut self, id: u64) {
        self.entries.remove(&id);
    }

    fn evict(&mut self) -> Option<u64> {
        self.evict_one()
    }
}
