//! Two-generation rotating deduplication cache.
//!
//! The cache keeps two fingerprint sets, each capped at a fixed capacity.
//! Inserts always go into the current generation; when it fills up it
//! becomes the previous generation, the old previous generation is dropped,
//! and a fresh current generation begins. Lookups consult both generations,
//! so a fingerprint stays "known" across one rotation boundary while memory
//! stays bounded at roughly twice the per-generation capacity.
//!
//! Rotation, not LRU: eviction happens a generation at a time, which is the
//! observable behavior downstream duplicate detection depends on.

use crate::fingerprint::Fingerprint;
use parking_lot::Mutex;
use std::collections::HashSet;

/// Default per-generation capacity in fingerprints.
pub const DEFAULT_DEDUP_CAPACITY: usize = 10_000;

struct Generations {
    current: HashSet<Fingerprint>,
    previous: HashSet<Fingerprint>,
}

/// Bounded record of recently seen message fingerprints.
pub struct DoubleCache {
    capacity: usize,
    inner: Mutex<Generations>,
}

impl DoubleCache {
    /// Creates a cache holding up to `capacity` fingerprints per generation.
    ///
    /// A zero capacity is rounded up to one so rotation stays well-defined.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Generations {
                current: HashSet::with_capacity(capacity),
                previous: HashSet::new(),
            }),
        }
    }

    /// Atomically checks whether `fingerprint` is known and records it.
    ///
    /// Returns true if the fingerprint was already present in either
    /// generation (the message is a duplicate and must be dropped), false
    /// if it was novel and has now been recorded. Check and insert happen
    /// under one lock, so concurrent callers racing on the same fingerprint
    /// see exactly one novel result.
    pub fn check_and_mark(&self, fingerprint: Fingerprint) -> bool {
        let mut inner = self.inner.lock();
        if inner.current.contains(&fingerprint) || inner.previous.contains(&fingerprint) {
            return true;
        }
        inner.current.insert(fingerprint);
        if inner.current.len() >= self.capacity {
            let filled = std::mem::replace(&mut inner.current, HashSet::with_capacity(self.capacity));
            inner.previous = filled;
        }
        false
    }

    /// Returns true if `fingerprint` is present in either generation,
    /// without recording it.
    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        let inner = self.inner.lock();
        inner.current.contains(fingerprint) || inner.previous.contains(fingerprint)
    }

    /// Total fingerprints currently held across both generations.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner.current.len() + inner.previous.len()
    }

    /// Returns true if no fingerprints are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for DoubleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("DoubleCache")
            .field("capacity", &self.capacity)
            .field("current", &inner.current.len())
            .field("previous", &inner.previous.len())
            .finish()
    }
}
