//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::{Path, PathBuf};

/// File name of the project configuration.
pub const CONFIG_FILE: &str = "dtsc.toml";

/// Loads and validates a `dtsc.toml` configuration from a project directory.
///
/// Reads `<project_dir>/dtsc.toml`, parses it, and validates option ranges.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `dtsc.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Walks up from `start` looking for the nearest directory containing `dtsc.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ConfigError::NotFound(start.display().to_string()));
        }
    }
}

/// Validates that option values are usable by the cache engine.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.cache.parallel_limit == 0 {
        return Err(ConfigError::ValidationError(
            "cache.parallel_limit must be at least 1".to_string(),
        ));
    }
    if config.cache.cache_version.trim().is_empty() {
        return Err(ConfigError::MissingField("cache.cache_version".to_string()));
    }
    if let Some(program) = config.bundler.command.first() {
        if program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "bundler.command must start with a program name".to_string(),
            ));
        }
    }
    Ok(())
}
