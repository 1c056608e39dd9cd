//! Batch scheduling of declaration generation against an external bundler.
//!
//! Stale entrypoints are split into contiguous batches of at most
//! `parallel_limit` and handed to the bundler one batch at a time. Batch
//! `i + 1` is not started until batch `i` has returned; any concurrency
//! within a batch is up to the bundler.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::{BundlerError, CacheError};

/// One entrypoint handed to the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPointConfig {
    /// Path of the entrypoint source file.
    pub file_path: PathBuf,
}

/// Generates declaration bundles for a batch of entrypoints.
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Generates one declaration bundle per entry, in the same order as `entries`.
    ///
    /// `config_hint` is the project configuration file the bundler should
    /// prefer, if one was found.
    async fn generate(
        &self,
        entries: &[EntryPointConfig],
        config_hint: Option<&Path>,
    ) -> Result<Vec<String>, BundlerError>;
}

/// Splits entrypoints into contiguous, order-preserving batches of at most `limit`.
///
/// A limit of 0 is treated as 1.
pub fn plan_batches(entrypoints: &[PathBuf], limit: usize) -> std::slice::Chunks<'_, PathBuf> {
    entrypoints.chunks(limit.max(1))
}

/// Generates declarations for every entrypoint, one bundler call per batch.
///
/// Returns the generated content keyed by entrypoint path. The first failing
/// batch aborts the run; earlier batches' results are discarded.
pub async fn generate_batches(
    bundler: &dyn Bundler,
    entrypoints: &[PathBuf],
    config_hint: Option<&Path>,
    limit: usize,
) -> Result<BTreeMap<PathBuf, String>, CacheError> {
    let mut results = BTreeMap::new();

    for (index, batch) in plan_batches(entrypoints, limit).enumerate() {
        let configs: Vec<EntryPointConfig> = batch
            .iter()
            .map(|path| EntryPointConfig {
                file_path: path.clone(),
            })
            .collect();

        debug!(batch = index, size = configs.len(), "dispatching bundler batch");
        let outputs = bundler.generate(&configs, config_hint).await?;

        if outputs.len() != batch.len() {
            return Err(CacheError::BundlerOutputMismatch {
                expected: batch.len(),
                actual: outputs.len(),
            });
        }

        results.extend(batch.iter().cloned().zip(outputs));
    }

    Ok(results)
}
