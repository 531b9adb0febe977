//! The versioned cache store contract.
//!
//! One generation is one immutable snapshot of the asset manifest. The
//! store never evicts per entry; superseded generations are deleted whole.

use super::entries::CachedResponse;
use crate::Error;
use async_trait::async_trait;

/// Lookup scope for [`CacheStore::match_response`].
///
/// The runtime fetch path always scopes to the current generation; `Any`
/// searches every generation and exists for install verification and
/// diagnostics.
#[derive(Debug, Clone, Copy)]
pub enum MatchScope<'a> {
    /// Search a single generation.
    Generation(&'a str),
    /// Search all generations, newest entry first.
    Any,
}

/// Storage capability consumed by the lifecycle manager and the fetch
/// interceptor.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Idempotently create the named generation. The generation is
    /// queryable (empty) as soon as this returns.
    async fn open(&self, generation: &str) -> Result<(), Error>;

    /// Enumerate every generation present in storage, including ones
    /// created by earlier deployments.
    async fn list_generations(&self) -> Result<Vec<String>, Error>;

    /// Remove a generation and all its entries. Idempotent; returns false
    /// if the generation was absent.
    async fn delete_generation(&self, generation: &str) -> Result<bool, Error>;

    /// Store a batch of responses in one transaction: either every response
    /// lands or none do.
    async fn put_responses(&self, generation: &str, responses: &[CachedResponse]) -> Result<(), Error>;

    /// Look up a stored response by request identity (method + URL).
    async fn match_response(
        &self, scope: MatchScope<'_>, method: &str, url: &str,
    ) -> Result<Option<CachedResponse>, Error>;

    /// Number of entries in a generation.
    async fn count_responses(&self, generation: &str) -> Result<u64, Error>;
}
