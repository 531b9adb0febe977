//! Fetch interception and the network-first fallback policy.
//!
//! Only two kinds of requests are intervened on: manifest members and
//! HTML/navigation requests. Everything else bypasses the worker so that
//! requests the store cannot meaningfully serve (analytics beacons,
//! dynamic third-party calls) keep default browser behavior.

use std::sync::Arc;

use rmnnt_core::cache::{CacheStore, MatchScope, generation_key};
use rmnnt_core::{AssetManifest, CachedResponse, Error, Network, Request};
use serde::{Deserialize, Serialize};
use url::Url;

/// Where an intervened response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Live network response, returned verbatim.
    Network,
    /// Cached copy from the current generation.
    Cache,
    /// The designated offline document, substituted for a failed
    /// navigation with no exact cached match.
    OfflineDocument,
}

/// Outcome of a fetch event.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intervened: the host performs its default fetch.
    Bypass,
    /// Intervened and resolved with a response.
    Respond { response: CachedResponse, source: ResponseSource },
    /// Intervened, network down, nothing cached: the host surfaces a
    /// network error to the page.
    Unreachable,
}

/// Reacts to fetch events with the network-first policy.
pub struct FetchInterceptor<S, N> {
    store: Arc<S>,
    network: Arc<N>,
    generation: String,
    manifest: AssetManifest,
    offline_document: Url,
}

impl<S: CacheStore, N: Network> FetchInterceptor<S, N> {
    pub fn new(
        store: Arc<S>, network: Arc<N>, version_tag: &str, manifest: AssetManifest, offline_document: Url,
    ) -> Self {
        Self { store, network, generation: generation_key(version_tag), manifest, offline_document }
    }

    /// The interception filter: manifest members and HTML/navigation
    /// requests are ours, everything else passes through.
    pub fn should_intercept(&self, request: &Request) -> bool {
        self.manifest.contains(&request.url) || request.is_navigation()
    }

    /// Apply the fallback chain to one fetch event.
    ///
    /// Network first: any live response wins, even an error status and
    /// even when a cached copy exists. Only transport failure falls back
    /// to the current generation, and for navigation requests that miss,
    /// to the offline document.
    pub async fn on_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if !self.should_intercept(request) {
            return Ok(FetchOutcome::Bypass);
        }

        let failure = match self.network.fetch(request).await {
            Ok(response) => {
                return Ok(FetchOutcome::Respond { response, source: ResponseSource::Network });
            }
            Err(e) => e,
        };

        tracing::debug!(url = %request.url, error = %failure, "network unreachable, falling back to cache");

        let scope = MatchScope::Generation(&self.generation);

        if let Some(response) = self
            .store
            .match_response(scope, &request.method, request.url.as_str())
            .await?
        {
            return Ok(FetchOutcome::Respond { response, source: ResponseSource::Cache });
        }

        if request.is_navigation() {
            if let Some(response) = self
                .store
                .match_response(scope, "GET", self.offline_document.as_str())
                .await?
            {
                tracing::debug!(url = %request.url, "serving offline document");
                return Ok(FetchOutcome::Respond { response, source: ResponseSource::OfflineDocument });
            }
        }

        Ok(FetchOutcome::Unreachable)
    }
}
