//! Build resolution: merging command-line overrides onto the project configuration.

use crate::error::ConfigError;
use crate::types::{CacheDir, Options, ProjectConfig};
use std::path::{Path, PathBuf};

/// Command-line overrides applied on top of `dtsc.toml`.
#[derive(Debug, Default)]
pub struct BuildOverrides {
    /// Entrypoints given on the command line; replace the configured list when non-empty.
    pub entrypoints: Vec<PathBuf>,
    /// Output directory given on the command line.
    pub outdir: Option<PathBuf>,
    /// Disables caching regardless of `cache.cache_dir`.
    pub no_cache: bool,
}

/// A fully resolved build with every path anchored at the project root.
#[derive(Debug)]
pub struct ResolvedBuild {
    /// The project root all relative paths were joined onto.
    pub root: PathBuf,
    /// Sorted, de-duplicated entrypoints.
    pub entrypoints: Vec<PathBuf>,
    /// Output directory for declaration files.
    pub outdir: PathBuf,
    /// Engine options with the cache directory and tsconfig hint anchored at the root.
    pub options: Options,
    /// Bundler program and arguments.
    pub bundler_command: Vec<String>,
}

/// Resolves the configuration and command-line overrides into a single build.
///
/// Command-line entrypoints replace the configured list entirely rather than
/// extending it. Entrypoints are sorted and de-duplicated, matching the order
/// the cache engine keys its entries by.
pub fn resolve_build(
    config: &ProjectConfig,
    root: &Path,
    overrides: &BuildOverrides,
) -> Result<ResolvedBuild, ConfigError> {
    let raw_entries = if overrides.entrypoints.is_empty() {
        &config.build.entrypoints
    } else {
        &overrides.entrypoints
    };
    if raw_entries.is_empty() {
        return Err(ConfigError::MissingField("build.entrypoints".to_string()));
    }

    let mut entrypoints: Vec<PathBuf> = raw_entries.iter().map(|p| root.join(p)).collect();
    entrypoints.sort();
    entrypoints.dedup();

    let outdir = root.join(overrides.outdir.as_ref().unwrap_or(&config.build.outdir));

    let mut options = config.cache.clone();
    if overrides.no_cache {
        options.cache_dir = None;
    } else if let Some(dir) = options.resolve_cache_dir(root) {
        options.cache_dir = Some(CacheDir::Path(dir));
    }
    options.tsconfig = options.tsconfig.map(|p| root.join(p));

    Ok(ResolvedBuild {
        root: root.to_path_buf(),
        entrypoints,
        outdir,
        options,
        bundler_command: config.bundler.command.clone(),
    })
}
