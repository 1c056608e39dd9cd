//! Persisted cache file: schema, compressed encoding, and atomic replacement.
//!
//! The cache is stored as gzip-compressed, pretty-printed JSON at
//! `<cache_dir>/dts-cache.json`. Writes go to a sibling `.tmp` file that is
//! renamed over the real file, so readers never see a partial cache and a
//! failed write leaves the previous cache intact.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CacheError;

/// Name of the cache file within the cache directory.
pub const CACHE_FILENAME: &str = "dts-cache.json";

/// Cached declaration output for a single entrypoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Hex content fingerprint, or empty when content hashing is disabled.
    pub hash: String,

    /// Modification time in milliseconds since the Unix epoch.
    pub mtime: u64,

    /// Generated declaration text.
    pub content: String,

    /// Millisecond timestamp of the last build that used or validated this entry.
    #[serde(default)]
    pub last_used: u64,
}

/// Root object of the persisted cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheFile {
    /// Schema version; files with a different version are discarded on load.
    pub version: String,

    /// Per-entrypoint entries, keyed by entrypoint path.
    pub entries: BTreeMap<PathBuf, CacheEntry>,
}

impl CacheFile {
    /// Creates an empty cache for the given schema version.
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            entries: BTreeMap::new(),
        }
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Why a load fell back to an empty cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColdReason {
    /// No cache file exists yet.
    Missing,
    /// The cache file exists but is empty.
    Empty,
    /// The cache file could not be read.
    Unreadable(String),
    /// The cache file is not valid gzip or not valid UTF-8.
    Decompress(String),
    /// The decompressed content is not a valid cache document.
    Parse(String),
    /// The cache file was written with a different schema version.
    VersionMismatch {
        /// The version found in the file.
        found: String,
    },
}

impl std::fmt::Display for ColdReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "no cache file"),
            Self::Empty => write!(f, "cache file is empty"),
            Self::Unreadable(e) => write!(f, "cache file unreadable: {e}"),
            Self::Decompress(e) => write!(f, "cache file is not valid gzip: {e}"),
            Self::Parse(e) => write!(f, "cache file is malformed: {e}"),
            Self::VersionMismatch { found } => write!(f, "cache version {found} is outdated"),
        }
    }
}

/// Result of loading the cache file.
///
/// A load never fails: every problem is reported as [`LoadOutcome::Cold`]
/// and the caller starts from an empty cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A valid cache file with the expected version was loaded.
    Warm(CacheFile),
    /// Start from an empty cache, for the given reason.
    Cold(ColdReason),
}

impl LoadOutcome {
    /// Returns the loaded cache, or an empty one for `version` on a cold start.
    pub fn into_cache(self, version: &str) -> (CacheFile, Option<ColdReason>) {
        match self {
            Self::Warm(cache) => (cache, None),
            Self::Cold(reason) => (CacheFile::new(version), Some(reason)),
        }
    }
}

/// Serializes a cache to pretty-printed JSON and gzip-compresses it.
pub fn encode(cache: &CacheFile) -> Result<Vec<u8>, CacheError> {
    let json = serde_json::to_vec_pretty(cache).map_err(|e| CacheError::Serialization {
        reason: e.to_string(),
    })?;
    let mut encoder = GzEncoder::new(Vec::with_capacity(json.len() / 4), Compression::default());
    encoder.write_all(&json).map_err(|e| CacheError::Serialization {
        reason: e.to_string(),
    })?;
    encoder.finish().map_err(|e| CacheError::Serialization {
        reason: e.to_string(),
    })
}

/// Decompresses and parses raw cache bytes, checking the schema version.
pub fn decode(raw: &[u8], version: &str) -> LoadOutcome {
    if raw.is_empty() {
        return LoadOutcome::Cold(ColdReason::Empty);
    }

    let mut json = String::new();
    if let Err(e) = GzDecoder::new(raw).read_to_string(&mut json) {
        return LoadOutcome::Cold(ColdReason::Decompress(e.to_string()));
    }

    let cache: CacheFile = match serde_json::from_str(&json) {
        Ok(cache) => cache,
        Err(e) => return LoadOutcome::Cold(ColdReason::Parse(e.to_string())),
    };

    if cache.version != version {
        return LoadOutcome::Cold(ColdReason::VersionMismatch {
            found: cache.version,
        });
    }

    LoadOutcome::Warm(cache)
}

/// Reads and writes the cache file for one cache directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Full path to `dts-cache.json`.
    path: PathBuf,

    /// Expected schema version.
    version: String,
}

impl CacheStore {
    /// Creates a store for `<cache_dir>/dts-cache.json` expecting `version`.
    pub fn new(cache_dir: &Path, version: &str) -> Self {
        Self {
            path: cache_dir.join(CACHE_FILENAME),
            version: version.to_string(),
        }
    }

    /// Returns the path of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the expected schema version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the sibling temporary path used during atomic writes.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Loads the cache file.
    ///
    /// Missing, empty, corrupt, or outdated files all yield
    /// [`LoadOutcome::Cold`]; this never returns an error.
    pub async fn load(&self) -> LoadOutcome {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return LoadOutcome::Cold(ColdReason::Missing);
            }
            Err(e) => return LoadOutcome::Cold(ColdReason::Unreadable(e.to_string())),
        };

        let outcome = decode(&raw, &self.version);
        match &outcome {
            LoadOutcome::Warm(cache) => {
                debug!(path = %self.path.display(), entries = cache.len(), "loaded cache");
            }
            LoadOutcome::Cold(reason @ (ColdReason::Empty | ColdReason::VersionMismatch { .. })) => {
                debug!(path = %self.path.display(), %reason, "starting with an empty cache");
            }
            LoadOutcome::Cold(reason) => {
                warn!(path = %self.path.display(), %reason, "discarding unusable cache file");
            }
        }
        outcome
    }

    /// Persists the cache atomically.
    ///
    /// Creates the cache directory if needed, writes the compressed document
    /// to [`temp_path`](Self::temp_path), then renames it over the cache file.
    pub async fn save(&self, cache: &CacheFile) -> Result<(), CacheError> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| CacheError::Io {
                    path: dir.to_path_buf(),
                    source: e,
                })?;
        }

        let bytes = encode(cache)?;
        let temp = self.temp_path();

        if let Err(e) = tokio::fs::write(&temp, &bytes).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(CacheError::Io {
                path: temp,
                source: e,
            });
        }

        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(CacheError::Io {
                path: self.path.clone(),
                source: e,
            });
        }

        debug!(path = %self.path.display(), entries = cache.len(), bytes = bytes.len(), "saved cache");
        Ok(())
    }

    /// Deletes the cache file. Returns `true` if a file was removed.
    pub async fn clear(&self) -> Result<bool, CacheError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::Io {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}
