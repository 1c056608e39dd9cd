//! Discovery of the project configuration file passed to the bundler as a hint.

use std::path::{Path, PathBuf};

/// File name probed for when no explicit hint is configured.
pub const TSCONFIG_FILE: &str = "tsconfig.json";

/// Walks up from `start` looking for the nearest `tsconfig.json`.
pub async fn find_tsconfig(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        let candidate = dir.join(TSCONFIG_FILE);
        if tokio::fs::metadata(&candidate)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return Some(candidate);
        }
    }
    None
}

/// Resolves the configuration hint for one build.
///
/// An explicitly configured path wins; otherwise the working tree is probed.
/// `None` is a valid result and means the bundler uses its own defaults.
pub async fn resolve_config_hint(explicit: Option<&Path>, root: &Path) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_tsconfig(root).await,
    }
}
