//! Per-entrypoint observation and staleness decisions.
//!
//! Each build stats every entrypoint (and optionally fingerprints its
//! content), drops cache entries for entrypoints that no longer exist, and
//! then compares each observation against its cached entry.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use dtsc_common::{system_time_millis, ContentHash};
use futures::future::join_all;

use crate::store::CacheFile;

/// A fresh observation of one entrypoint for the current build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// The entrypoint path.
    pub path: PathBuf,
    /// Hex content fingerprint, or empty when not hashed or unreadable.
    pub hash: String,
    /// Modification time in milliseconds, or 0 when the stat failed.
    pub mtime: u64,
    /// False when the stat or read failed.
    pub readable: bool,
}

impl Observation {
    /// An observation for a file that could not be stat'd or read.
    ///
    /// Always stale, even against an entry holding the same empty hash and
    /// zero mtime.
    pub fn unreadable(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            hash: String::new(),
            mtime: 0,
            readable: false,
        }
    }
}

/// How an observation is compared against its cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    /// Stale iff the content fingerprint changed.
    ContentHash,
    /// Stale iff the modification time changed.
    Mtime,
}

impl CompareMode {
    /// Picks the comparison mode from the `use_content_hashing` option.
    pub fn from_hashing(use_content_hashing: bool) -> Self {
        if use_content_hashing {
            Self::ContentHash
        } else {
            Self::Mtime
        }
    }
}

/// Staleness verdict for one entrypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// No cached entry exists.
    Missing,
    /// A cached entry exists but no longer matches the source.
    Changed,
    /// The cached entry is still valid.
    Fresh,
}

impl Staleness {
    /// Returns `true` if the entrypoint must be regenerated.
    pub fn is_stale(self) -> bool {
        !matches!(self, Self::Fresh)
    }
}

/// Stats an entrypoint and, when `hash_contents` is set, fingerprints its content.
///
/// Any I/O failure yields [`Observation::unreadable`].
pub async fn observe(path: &Path, hash_contents: bool) -> Observation {
    let mtime = match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
        Ok(modified) => system_time_millis(modified),
        Err(_) => return Observation::unreadable(path),
    };

    let hash = if hash_contents {
        match tokio::fs::read(path).await {
            Ok(bytes) => ContentHash::from_bytes(&bytes).to_hex(),
            Err(_) => return Observation::unreadable(path),
        }
    } else {
        String::new()
    };

    Observation {
        path: path.to_path_buf(),
        hash,
        mtime,
        readable: true,
    }
}

/// Observes all entrypoints concurrently, preserving input order.
pub async fn observe_all(paths: &[PathBuf], hash_contents: bool) -> Vec<Observation> {
    join_all(paths.iter().map(|p| observe(p, hash_contents))).await
}

/// Removes cache entries whose key is not among the current entrypoints.
///
/// Returns the removed keys in sorted order.
pub fn invalidate_stale_keys(cache: &mut CacheFile, entrypoints: &[PathBuf]) -> Vec<PathBuf> {
    if cache.is_empty() {
        return Vec::new();
    }

    let current: BTreeSet<&Path> = entrypoints.iter().map(PathBuf::as_path).collect();
    let removed: Vec<PathBuf> = cache
        .entries
        .keys()
        .filter(|key| !current.contains(key.as_path()))
        .cloned()
        .collect();

    for key in &removed {
        cache.entries.remove(key);
    }
    removed
}

/// Compares an observation against its cached entry.
///
/// When an entry exists its `last_used` is bumped to `now`, whether or not it
/// is still valid, so the caller must treat any verdict other than
/// [`Staleness::Missing`] as a cache mutation. An unreadable observation is
/// never [`Staleness::Fresh`].
pub fn check(cache: &mut CacheFile, observed: &Observation, mode: CompareMode, now: u64) -> Staleness {
    let Some(entry) = cache.entries.get_mut(&observed.path) else {
        return Staleness::Missing;
    };

    entry.last_used = now;

    if !observed.readable {
        return Staleness::Changed;
    }

    let unchanged = match mode {
        CompareMode::ContentHash => entry.hash == observed.hash,
        CompareMode::Mtime => entry.mtime == observed.mtime,
    };

    if unchanged {
        Staleness::Fresh
    } else {
        Staleness::Changed
    }
}
