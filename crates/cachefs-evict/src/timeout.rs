//! Time-based eviction policy
//!
//! A supplemental variant alongside [`crate::WeightedLru`]: entries expire
//! after a fixed timeout regardless of size or hotness, the way the
//! original cache's `cache_apply_eviction()` swept anything idle past its
//! timeout rather than ranking by weight.

use crate::EvictionPolicy;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct TimeoutPolicy {
    timeout: Duration,
    last_touch: HashMap<u64, Instant>,
}

impl TimeoutPolicy {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_touch: HashMap::new(),
        }
    }
}

impl EvictionPolicy for TimeoutPolicy {
    fn touch(&mut self, id: u64, _bytes: u64, _hotness: f32) {
        self.last_touch.insert(id, Instant::now());
    }

    fn remove(&mut self, id: u64) {
        self.last_touch.remove(&id);
    }

    fn evict(&mut self) -> Option<u64> {
        let now = Instant::now();
        let expired = self
            .last_touch
            .iter()
            .find(|(_, t)| now.duration_since(**t) >= self.timeout)
            .map(|(id, _)| *id);

        if let Some(id) = expired {
            self.last_touch.remove(&id);
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn entry_within_timeout_is_not_evicted() {
        let mut policy = TimeoutPolicy::new(Duration::from_secs(60));
        policy.touch(1, 10, 0.0);
        assert_eq!(policy.evict(), None);
    }

    #[test]
    fn entry_past_timeout_is_evicted() {
        let mut policy = TimeoutPolicy::new(Duration::from_millis(10));
        policy.touch(1, 10, 0.0);
        sleep(Duration::from_millis(30));
        assert_eq!(policy.evict(), Some(1));
        assert_eq!(policy.evict(), None);
    }

    #[test]
    fn remove_prevents_future_eviction() {
        let mut policy = TimeoutPolicy::new(Duration::from_millis(10));
        policy.touch(1, 10, 0.0);
        policy.remove(1);
        sleep(Duration::from_millis(30));
        assert_eq!(policy.evict(), None);
    }
}
