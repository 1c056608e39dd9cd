//! Error types for cache and bundler operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Loading is fail-safe and never produces one of these: a bad cache file
/// degrades to a cold start instead. Persistence errors are reported to the
/// engine, which logs them and keeps the build's outputs. Only output
/// collisions, bundler failures and output write failures abort a build.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing a file.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The cache file could not be serialized or compressed.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The external bundler failed for a batch.
    #[error("bundler failed: {0}")]
    Bundler(#[from] BundlerError),

    /// The bundler returned a different number of outputs than it was given inputs.
    #[error("bundler returned {actual} outputs for a batch of {expected} entrypoints")]
    BundlerOutputMismatch {
        /// Number of entrypoints in the batch.
        expected: usize,
        /// Number of outputs the bundler returned.
        actual: usize,
    },

    /// Two entrypoints map to the same declaration file.
    #[error("{first} and {second} would both write {output}")]
    OutputCollision {
        /// The shared output path.
        output: PathBuf,
        /// The entrypoint that claimed the output first.
        first: PathBuf,
        /// The entrypoint that collided with it.
        second: PathBuf,
    },
}

/// Errors reported by a [`Bundler`](crate::Bundler) implementation.
#[derive(Debug, thiserror::Error)]
pub enum BundlerError {
    /// The bundler process could not be started or communicated with.
    #[error("failed to run bundler `{program}`: {source}")]
    Spawn {
        /// The program that was being run.
        program: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The bundler process exited unsuccessfully.
    #[error("bundler exited with {status}: {stderr}")]
    Failed {
        /// Rendered exit status.
        status: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The bundler's output could not be understood.
    #[error("bundler produced invalid output: {reason}")]
    InvalidOutput {
        /// Description of the problem.
        reason: String,
    },

    /// Any other bundler-specific failure.
    #[error("{0}")]
    Other(String),
}
