//! Core types and shared functionality for rmnnt-sw.
//!
//! This crate provides:
//! - Versioned cache store with SQLite backend
//! - Asset manifest and request model
//! - Network capability trait
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;
pub mod net;
pub mod request;

pub use cache::{CacheDb, CacheStore, CachedResponse, MatchScope};
pub use config::AppConfig;
pub use error::Error;
pub use manifest::AssetManifest;
pub use net::Network;
pub use request::{Request, RequestMode};
