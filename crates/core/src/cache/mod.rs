//! SQLite-backed versioned cache of application assets.
//!
//! This module provides the worker's asset store using SQLite with async
//! access via tokio-rusqlite. It supports:
//!
//! - Versioned generations, each an immutable snapshot of the manifest
//! - Whole-generation deletion (no per-entry eviction)
//! - Request-identity lookup (method + URL) scoped to one generation or all
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod keys;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedResponse;
pub use keys::{CACHE_NAMESPACE, compute_entry_key, generation_key, version_prefix};
pub use store::{CacheStore, MatchScope};
