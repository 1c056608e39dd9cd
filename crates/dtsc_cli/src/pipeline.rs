//! Shared helpers for CLI commands: project root resolution, config loading,
//! and logging setup.

use std::path::{Path, PathBuf};

use dtsc_config::{find_project_root, ProjectConfig, CONFIG_FILE};
use tracing_subscriber::EnvFilter;

use crate::GlobalArgs;

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--quiet` selects `error`, `--verbose`
/// selects `debug`, and the default is `info`.
pub fn init_tracing(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(global)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn default_level(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "info"
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `dtsc.toml`.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let root = match &global.config {
        Some(path) => project_dir_of(path),
        None => find_project_root(&std::env::current_dir()?)?,
    };
    Ok(std::path::absolute(root)?)
}

fn project_dir_of(config: &Path) -> PathBuf {
    if config.is_file() {
        config
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        config.to_path_buf()
    }
}

/// Resolves the project root and loads its `dtsc.toml`.
///
/// A project directory without a config file gets the default configuration.
pub fn load_project(
    global: &GlobalArgs,
) -> Result<(PathBuf, ProjectConfig), Box<dyn std::error::Error>> {
    let root = resolve_project_root(global)?;
    let config = if root.join(CONFIG_FILE).is_file() {
        dtsc_config::load_config(&root)?
    } else {
        ProjectConfig::default()
    };
    Ok((root, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(config: Option<PathBuf>) -> GlobalArgs {
        GlobalArgs {
            quiet: false,
            verbose: false,
            config,
        }
    }

    #[test]
    fn config_file_resolves_to_parent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE);
        std::fs::write(&file, "").unwrap();
        let root = resolve_project_root(&global(Some(file))).unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn config_dir_resolves_to_itself() {
        let dir = tempfile::tempdir().unwrap();
        let root = resolve_project_root(&global(Some(dir.path().to_path_buf()))).unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (root, config) = load_project(&global(Some(dir.path().to_path_buf()))).unwrap();
        assert_eq!(root, dir.path());
        assert!(config.build.entrypoints.is_empty());
        assert!(!config.cache.caching_enabled());
    }

    #[test]
    fn loads_config_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[build]\nentrypoints = [\"src/index.ts\"]\n\n[cache]\ncache_dir = true\n",
        )
        .unwrap();
        let (_, config) = load_project(&global(Some(dir.path().to_path_buf()))).unwrap();
        assert_eq!(config.build.entrypoints, vec![PathBuf::from("src/index.ts")]);
        assert!(config.cache.caching_enabled());
    }

    #[test]
    fn log_levels() {
        let mut g = global(None);
        assert_eq!(default_level(&g), "info");
        g.verbose = true;
        assert_eq!(default_level(&g), "debug");
        g.quiet = true;
        assert_eq!(default_level(&g), "error");
    }
}
