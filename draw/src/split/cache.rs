//! Direct-mapped vertex cache for the copying splitter.

/// Number of cache entries.
pub const CACHE_SIZE: usize = 16;

/// Maps source vertex indices to destination indices within one chunk.
///
/// A miss only costs a redundant vertex copy, so aliasing between indices
/// that share a slot is harmless.
#[derive(Debug, Clone)]
pub struct VertexCache {
    slots: [Option<(u32, u32)>; CACHE_SIZE],
    enabled: bool,
    hits: u64,
    misses: u64,
}

impl VertexCache {
    /// Create an empty cache. A disabled cache misses on every lookup.
    pub fn new(enabled: bool) -> Self {
        Self {
            slots: [None; CACHE_SIZE],
            enabled,
            hits: 0,
            misses: 0,
        }
    }

    #[inline]
    fn slot(key: u32) -> usize {
        key as usize & (CACHE_SIZE - 1)
    }

    /// Destination index cached for `key`.
    pub fn lookup(&mut self, key: u32) -> Option<u32> {
        let found = match self.slots[Self::slot(key)] {
            Some((src, dst)) if self.enabled && src == key => Some(dst),
            _ => None,
        };
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    /// Record that `key` was copied to `dst`.
    pub fn insert(&mut self, key: u32, dst: u32) {
        if self.enabled {
            self.slots[Self::slot(key)] = Some((key, dst));
        }
    }

    /// Mark every slot unused.
    pub fn clear(&mut self) {
        self.slots = [None; CACHE_SIZE];
    }

    /// Lookups that found a cached vertex.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that required a copy.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}
