//! Rejected-Term Cache
//!
//! Surfaces the LLM has rejected during this session, so the same form is not
//! paid for twice. Bounded, least-recently-used eviction, never persisted.

use lru::LruCache;
use std::num::NonZeroUsize;

/// Capacity used when none (or zero) is configured.
pub const DEFAULT_REJECTED_TERMS_LIMIT: usize = 1000;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(DEFAULT_REJECTED_TERMS_LIMIT) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// Bounded map from lowercase surface to last-seen time (ms since epoch).
#[derive(Debug)]
pub struct RejectedTerms {
    entries: LruCache<String, i64>,
    evictions: u64,
}

impl RejectedTerms {
    /// Create with the given capacity; zero falls back to the default.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        Self {
            entries: LruCache::new(capacity),
            evictions: 0,
        }
    }

    /// Whether `term` was rejected. A hit refreshes its recency and timestamp.
    pub fn contains(&mut self, term: &str) -> bool {
        match self.entries.get_mut(term) {
            Some(seen) => {
                *seen = now_millis();
                true
            }
            None => false,
        }
    }

    /// Record a rejection, evicting the least recently used entry when full.
    pub fn insert(&mut self, term: &str) {
        if let Some((evicted, _)) = self.entries.push(term.to_string(), now_millis()) {
            if evicted != term {
                log::debug!("Rejected-term cache full, evicted '{}'", evicted);
                self.evictions += 1;
            }
        }
    }

    /// Membership test that does not touch recency.
    pub fn peek(&self, term: &str) -> bool {
        self.entries.contains(term)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }
}

impl Default for RejectedTerms {
    fn default() -> Self {
        Self::new(DEFAULT_REJECTED_TERMS_LIMIT)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_uses_default() {
        let cache = RejectedTerms::new(0);
        assert_eq!(cache.capacity(), DEFAULT_REJECTED_TERMS_LIMIT);
    }

    #[test]
    fn test_bounded_eviction() {
        let mut cache = RejectedTerms::new(3);
        for term in ["a", "b", "c", "d", "e"] {
            cache.insert(term);
        }

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.evictions(), 2);
        assert!(!cache.peek("a"));
        assert!(!cache.peek("b"));
        assert!(cache.peek("c") && cache.peek("d") && cache.peek("e"));
    }

    #[test]
    fn test_lookup_refreshes_recency() {
        let mut cache = RejectedTerms::new(3);
        cache.insert("a");
        cache.insert("b");
        cache.insert("c");

        // touching "a" makes "b" the eldest
        assert!(cache.contains("a"));
        cache.insert("d");

        assert!(cache.peek("a"));
        assert!(!cache.peek("b"));
        assert!(cache.peek("c"));
        assert!(cache.peek("d"));
    }

    #[test]
    fn test_reinsert_does_not_count_as_eviction() {
        let mut cache = RejectedTerms::new(2);
        cache.insert("a");
        cache.insert("a");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.evictions(), 0);
    }
}
