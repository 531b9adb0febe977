//! Network client for rmnnt-sw.
//!
//! This crate provides the live-network capability used by the worker for
//! install prefetch and runtime network-first fetches.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig};
