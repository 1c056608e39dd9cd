//! `dtsc cache`: inspect or reset the persisted cache file.

use std::fmt;
use std::path::PathBuf;

use dtsc_cache::{CacheStore, ColdReason, LoadOutcome};

use crate::pipeline::load_project;
use crate::{CacheAction, GlobalArgs};

/// Snapshot of the persisted cache, as printed by `dtsc cache stats`.
#[derive(Debug, PartialEq, Eq)]
pub struct CacheStats {
    /// Location of the cache file.
    pub path: PathBuf,
    /// Expected schema version.
    pub version: String,
    /// Number of entries in a warm cache; 0 when cold.
    pub entries: usize,
    /// Why the cache would start cold, if it would.
    pub cold: Option<ColdReason>,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "path:    {}", self.path.display())?;
        writeln!(f, "version: {}", self.version)?;
        writeln!(f, "entries: {}", self.entries)?;
        match &self.cold {
            None => write!(f, "state:   warm"),
            Some(reason) => write!(f, "state:   cold ({reason})"),
        }
    }
}

/// Loads the cache the same way a build would and summarizes it.
pub async fn stats(store: &CacheStore) -> CacheStats {
    let (entries, cold) = match store.load().await {
        LoadOutcome::Warm(cache) => (cache.len(), None),
        LoadOutcome::Cold(reason) => (0, Some(reason)),
    };
    CacheStats {
        path: store.path().to_path_buf(),
        version: store.version().to_string(),
        entries,
        cold,
    }
}

/// Runs the `dtsc cache` command.
///
/// Both actions are no-ops when caching is disabled in `dtsc.toml`.
pub async fn run(
    action: CacheAction,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let (root, config) = load_project(global)?;

    let Some(dir) = config.cache.resolve_cache_dir(&root) else {
        if !global.quiet {
            eprintln!("   Caching is disabled (set `cache.cache_dir` in dtsc.toml)");
        }
        return Ok(0);
    };
    let store = CacheStore::new(&dir, &config.cache.cache_version);

    match action {
        CacheAction::Stats => println!("{}", stats(&store).await),
        CacheAction::Clear => {
            let removed = store.clear().await?;
            if !global.quiet {
                if removed {
                    eprintln!("   Removed {}", store.path().display());
                } else {
                    eprintln!("   No cache file at {}", store.path().display());
                }
            }
        }
    }
    Ok(0)
}
