//! Configuration types deserialized from `dtsc.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Directory used when `cache_dir = true`.
pub const DEFAULT_CACHE_DIR: &str = ".cache";

/// Schema version written into new cache files.
pub const DEFAULT_CACHE_VERSION: &str = "1.0.0";

/// Number of entrypoints handed to the bundler per call.
pub const DEFAULT_PARALLEL_LIMIT: usize = 10;

/// Upper bound on cache entries before LRU eviction kicks in.
pub const DEFAULT_MAX_CACHE_ENTRIES: usize = 1000;

/// Output directory used when neither the config nor the CLI names one.
pub const DEFAULT_OUTDIR: &str = "./dist";

/// The top-level project configuration parsed from `dtsc.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    /// Entrypoints and output directory.
    #[serde(default)]
    pub build: BuildConfig,
    /// Cache engine options.
    #[serde(default)]
    pub cache: Options,
    /// External bundler invocation.
    #[serde(default)]
    pub bundler: BundlerConfig,
}

/// The `[build]` section: what to generate and where to put it.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    /// Source entrypoints, relative to the project directory.
    #[serde(default)]
    pub entrypoints: Vec<PathBuf>,
    /// Output directory for generated declaration files.
    #[serde(default = "default_outdir")]
    pub outdir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            entrypoints: Vec::new(),
            outdir: default_outdir(),
        }
    }
}

/// The `[bundler]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundlerConfig {
    /// Program and arguments of the bundler process (e.g. `["node", "bundle.mjs"]`).
    #[serde(default)]
    pub command: Vec<String>,
}

/// The `cache_dir` setting: a boolean switch or an explicit directory.
///
/// `false` disables caching, `true` selects [`DEFAULT_CACHE_DIR`], and a string
/// names the directory to use.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CacheDir {
    /// `cache_dir = true` or `cache_dir = false`.
    Enabled(bool),
    /// `cache_dir = "path/to/cache"`.
    Path(PathBuf),
}

/// Options consumed by the cache engine (the `[cache]` section).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Options {
    /// Cache directory setting. Absent disables caching.
    #[serde(default)]
    pub cache_dir: Option<CacheDir>,
    /// Compare entries by content fingerprint instead of modification time.
    #[serde(default = "default_true")]
    pub use_content_hashing: bool,
    /// Expected cache schema version; mismatching cache files are discarded.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,
    /// Maximum number of entrypoints per bundler call.
    #[serde(default = "default_parallel_limit")]
    pub parallel_limit: usize,
    /// Maximum number of cache entries kept after a build; `None` keeps all.
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: Option<usize>,
    /// Explicit config-file hint for the bundler; probed from the project when absent.
    #[serde(default)]
    pub tsconfig: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            cache_dir: None,
            use_content_hashing: true,
            cache_version: default_cache_version(),
            parallel_limit: DEFAULT_PARALLEL_LIMIT,
            max_cache_entries: Some(DEFAULT_MAX_CACHE_ENTRIES),
            tsconfig: None,
        }
    }
}

impl Options {
    /// Returns options with caching enabled in the given directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(CacheDir::Path(dir.into()));
        self
    }

    /// Resolves the effective cache directory, or `None` when caching is disabled.
    ///
    /// Relative directories are joined onto `root`.
    pub fn resolve_cache_dir(&self, root: &Path) -> Option<PathBuf> {
        match self.cache_dir.as_ref()? {
            CacheDir::Enabled(false) => None,
            CacheDir::Enabled(true) => Some(root.join(DEFAULT_CACHE_DIR)),
            CacheDir::Path(dir) => Some(root.join(dir)),
        }
    }

    /// Returns `true` if a cache directory is configured.
    pub fn caching_enabled(&self) -> bool {
        !matches!(self.cache_dir, None | Some(CacheDir::Enabled(false)))
    }
}

fn default_outdir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTDIR)
}

fn default_true() -> bool {
    true
}

fn default_cache_version() -> String {
    DEFAULT_CACHE_VERSION.to_string()
}

fn default_parallel_limit() -> usize {
    DEFAULT_PARALLEL_LIMIT
}

fn default_max_cache_entries() -> Option<usize> {
    Some(DEFAULT_MAX_CACHE_ENTRIES)
}
