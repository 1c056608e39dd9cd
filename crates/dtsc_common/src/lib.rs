//! Shared foundational types used across the dtsc declaration cache.
//!
//! This crate provides the content fingerprint used for change detection and
//! the millisecond clock helpers used for cache entry timestamps.

#![warn(missing_docs)]

pub mod hash;
pub mod time;

pub use hash::ContentHash;
pub use time::{now_millis, system_time_millis};
