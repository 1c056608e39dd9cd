//! Recency-bounded eviction of cache entries.

use std::path::PathBuf;

use crate::store::CacheFile;

/// How the cache is bounded after each build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Keep every entry.
    Unbounded,
    /// Keep at most `max_entries`, dropping the least recently used first.
    Lru {
        /// Maximum number of entries retained.
        max_entries: usize,
    },
}

impl EvictionPolicy {
    /// Builds the policy from the `max_cache_entries` option.
    ///
    /// `None` keeps every entry. `Some(0)` is a real bound and empties the
    /// cache after each build.
    pub fn from_max_entries(max_entries: Option<usize>) -> Self {
        match max_entries {
            None => Self::Unbounded,
            Some(max_entries) => Self::Lru { max_entries },
        }
    }

    /// Applies the policy, returning the evicted keys oldest first.
    ///
    /// Entries are ordered by ascending `last_used`, ties broken by key, and
    /// the oldest `len - max_entries` are removed.
    pub fn evict(self, cache: &mut CacheFile) -> Vec<PathBuf> {
        let max_entries = match self {
            Self::Unbounded => return Vec::new(),
            Self::Lru { max_entries } => max_entries,
        };
        if cache.len() <= max_entries {
            return Vec::new();
        }

        let mut by_age: Vec<(u64, &PathBuf)> = cache
            .entries
            .iter()
            .map(|(key, entry)| (entry.last_used, key))
            .collect();
        by_age.sort();

        let excess = cache.len() - max_entries;
        let victims: Vec<PathBuf> = by_age
            .into_iter()
            .take(excess)
            .map(|(_, key)| key.clone())
            .collect();

        for key in &victims {
            cache.entries.remove(key);
        }
        victims
    }
}
