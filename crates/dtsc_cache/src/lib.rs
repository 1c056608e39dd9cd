//! Incremental declaration-bundle cache engine.
//!
//! This crate memoizes per-entrypoint declaration output in a persisted,
//! versioned, gzip-compressed cache file. Entries are invalidated by content
//! fingerprint or modification time, bounded by LRU eviction, and regenerated
//! in sequential batches by an external [`Bundler`].

#![warn(missing_docs)]

pub mod bundler;
pub mod engine;
pub mod error;
pub mod eviction;
pub mod paths;
pub mod scheduler;
pub mod staleness;
pub mod store;
pub mod tsconfig;

pub use bundler::CommandBundler;
pub use engine::{BuildOutcome, BuildPhase, BuildReport, BuildRequest, CacheEngine, MutationLog};
pub use error::{BundlerError, CacheError};
pub use eviction::EvictionPolicy;
pub use scheduler::{Bundler, EntryPointConfig};
pub use staleness::{CompareMode, Observation, Staleness};
pub use store::{CacheEntry, CacheFile, CacheStore, ColdReason, LoadOutcome, CACHE_FILENAME};
