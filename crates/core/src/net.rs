//! Network capability consumed by the worker.

use crate::cache::CachedResponse;
use crate::request::Request;
use crate::Error;
use async_trait::async_trait;

/// Issue a request against the live network.
///
/// An `Err` means transport-level failure (offline, DNS, timeout): the
/// request never produced a response. HTTP error statuses are `Ok`; a 500
/// is still a response and the fetch policy returns it verbatim.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, Error>;
}
