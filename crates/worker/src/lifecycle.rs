//! Install and activate lifecycle policy.
//!
//! Install populates the current generation from the asset manifest as one
//! all-or-nothing batch. Activate sweeps every generation that does not
//! belong to the current version tag. The two never run concurrently in one
//! worker instance; the host dispatches them once each.

use std::sync::Arc;

use rmnnt_core::cache::{CacheStore, generation_key, version_prefix};
use rmnnt_core::{AssetManifest, CachedResponse, Error, Network, Request};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Result of a successful install.
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Storage key of the generation that was populated.
    pub generation: String,
    /// Number of manifest assets stored.
    pub assets: usize,
}

/// Per-generation outcome of the activation sweep.
#[derive(Debug)]
pub struct SweepOutcome {
    pub generation: String,
    /// Ok(true) deleted, Ok(false) already absent, Err means the delete
    /// failed and will be retried on the next activation.
    pub result: Result<bool, Error>,
}

/// Reacts to install and activate events.
pub struct CacheLifecycleManager<S, N> {
    store: Arc<S>,
    network: Arc<N>,
    version_tag: String,
    generation: String,
    manifest: AssetManifest,
    prefetch_concurrency: usize,
}

impl<S: CacheStore + 'static, N: Network + 'static> CacheLifecycleManager<S, N> {
    pub fn new(
        store: Arc<S>, network: Arc<N>, version_tag: &str, manifest: AssetManifest, prefetch_concurrency: usize,
    ) -> Self {
        Self {
            store,
            network,
            version_tag: version_tag.to_string(),
            generation: generation_key(version_tag),
            manifest,
            prefetch_concurrency,
        }
    }

    /// Storage key of the current generation.
    pub fn generation(&self) -> &str {
        &self.generation
    }

    /// Populate the current generation from the manifest.
    ///
    /// The prefetch runs as a parallel batch with bounded concurrency and
    /// fails fast: the first transport error or non-success status aborts
    /// the install, and nothing is written. Entries land in one
    /// transaction only after the whole batch has fetched, so a generation
    /// is either fully populated or not installed at all.
    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        self.store.open(&self.generation).await?;

        let semaphore = Arc::new(Semaphore::new(self.prefetch_concurrency));
        let mut join_set = JoinSet::new();

        for (index, url) in self.manifest.entries().iter().cloned().enumerate() {
            let permit = semaphore.clone().acquire_owned().await.unwrap();
            let network = self.network.clone();

            join_set.spawn(async move {
                // NOTE: Hold permit for task duration to enforce concurrency limit
                let _permit = permit;
                let request = Request::get(url.clone());
                let result = network.fetch(&request).await;
                (index, url, result)
            });
        }

        let mut fetched: Vec<(usize, CachedResponse)> = Vec::with_capacity(self.manifest.len());

        while let Some(joined) = join_set.join_next().await {
            let (index, url, result) =
                joined.map_err(|e| Error::Network(format!("prefetch task failed: {e}")))?;

            match result {
                Ok(response) if response.is_success() => fetched.push((index, response)),
                Ok(response) => {
                    join_set.shutdown().await;
                    return Err(Error::AssetFetch {
                        url: url.to_string(),
                        reason: format!("status {}", response.status),
                    });
                }
                Err(e) => {
                    join_set.shutdown().await;
                    return Err(Error::AssetFetch { url: url.to_string(), reason: e.to_string() });
                }
            }
        }

        fetched.sort_by_key(|(index, _)| *index);
        let responses: Vec<CachedResponse> = fetched.into_iter().map(|(_, response)| response).collect();

        self.store.put_responses(&self.generation, &responses).await?;

        tracing::info!(generation = %self.generation, assets = responses.len(), "generation populated");

        Ok(InstallReport { generation: self.generation.clone(), assets: responses.len() })
    }

    /// Delete every generation that does not belong to the current version
    /// tag.
    ///
    /// Deletions run concurrently; individual failures are logged and
    /// reported per generation but never fail the activation. Stale
    /// generations only waste storage: the fetch path is scoped to the
    /// current generation and never reads them.
    pub async fn on_activate(&self) -> Result<Vec<SweepOutcome>, Error> {
        let generations = self.store.list_generations().await?;
        let prefix = version_prefix(&self.version_tag);

        let sweeps = generations
            .into_iter()
            .filter(|generation| !generation.starts_with(&prefix))
            .map(|generation| {
                let store = self.store.clone();
                async move {
                    let result = store.delete_generation(&generation).await;
                    SweepOutcome { generation, result }
                }
            });

        let outcomes = futures::future::join_all(sweeps).await;

        for outcome in &outcomes {
            match &outcome.result {
                Ok(_) => tracing::debug!(generation = %outcome.generation, "stale generation deleted"),
                Err(e) => {
                    tracing::warn!(generation = %outcome.generation, error = %e, "failed to delete stale generation")
                }
            }
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rmnnt_core::cache::{CacheDb, MatchScope, compute_entry_key};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    #[derive(Default)]
    struct StubNetwork {
        replies: HashMap<String, (u16, &'static [u8])>,
        calls: AtomicUsize,
    }

    impl StubNetwork {
        fn with_replies(replies: &[(&str, u16, &'static [u8])]) -> Self {
            Self {
                replies: replies
                    .iter()
                    .map(|(url, status, body)| (url.to_string(), (*status, *body)))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Network for StubNetwork {
        async fn fetch(&self, request: &Request) -> Result<CachedResponse, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies.get(request.url.as_str()) {
                Some((status, body)) => Ok(CachedResponse {
                    key: compute_entry_key(&request.method, request.url.as_str()),
                    method: request.method.clone(),
                    url: request.url.to_string(),
                    status: *status,
                    content_type: None,
                    headers_json: None,
                    body: body.to_vec(),
                    fetched_at: chrono::Utc::now().to_rfc3339(),
                }),
                None => Err(Error::Network("connection refused".into())),
            }
        }
    }

    fn scope() -> Url {
        Url::parse("https://app.example.com/").unwrap()
    }

    fn manifest(entries: &[&str]) -> AssetManifest {
        let entries: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
        AssetManifest::resolve(&scope(), &entries).unwrap()
    }

    fn manager<N: Network + 'static>(
        db: &CacheDb, network: N, version_tag: &str, manifest: AssetManifest,
    ) -> CacheLifecycleManager<CacheDb, N> {
        CacheLifecycleManager::new(Arc::new(db.clone()), Arc::new(network), version_tag, manifest, 4)
    }

    #[tokio::test]
    async fn test_install_populates_every_manifest_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = StubNetwork::with_replies(&[
            ("https://app.example.com/index.html", 200, b"<html>"),
            ("https://app.example.com/app.js", 200, b"js"),
            ("https://app.example.com/icon.png", 200, b"png"),
        ]);
        let lifecycle =
            manager(&db, network, "4", manifest(&["/index.html", "/app.js", "/icon.png"]));

        let report = lifecycle.on_install().await.unwrap();
        assert_eq!(report.generation, "4:sw-cache-");
        assert_eq!(report.assets, 3);

        for url in ["https://app.example.com/index.html", "https://app.example.com/app.js", "https://app.example.com/icon.png"] {
            let hit = db
                .match_response(MatchScope::Generation("4:sw-cache-"), "GET", url)
                .await
                .unwrap();
            assert!(hit.is_some(), "missing {url}");
        }
    }

    #[tokio::test]
    async fn test_install_fails_on_transport_error_and_persists_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        // /app.js has no reply: transport failure.
        let network = StubNetwork::with_replies(&[("https://app.example.com/index.html", 200, b"<html>")]);
        let lifecycle = manager(&db, network, "4", manifest(&["/index.html", "/app.js"]));

        let result = lifecycle.on_install().await;
        assert!(matches!(result, Err(Error::AssetFetch { .. })));
        assert_eq!(db.count_responses("4:sw-cache-").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_install_fails_on_error_status() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = StubNetwork::with_replies(&[
            ("https://app.example.com/index.html", 200, b"<html>"),
            ("https://app.example.com/app.js", 404, b"not found"),
        ]);
        let lifecycle = manager(&db, network, "4", manifest(&["/index.html", "/app.js"]));

        let result = lifecycle.on_install().await;
        match result {
            Err(Error::AssetFetch { url, reason }) => {
                assert_eq!(url, "https://app.example.com/app.js");
                assert!(reason.contains("404"));
            }
            other => panic!("expected AssetFetch error, got {other:?}"),
        }
        assert_eq!(db.count_responses("4:sw-cache-").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_activate_sweeps_stale_generations() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("3:sw-cache-").await.unwrap();
        db.open("4:sw-cache-").await.unwrap();
        db.open("other-cache").await.unwrap();

        let lifecycle = manager(&db, StubNetwork::default(), "4", manifest(&["/index.html"]));
        let outcomes = lifecycle.on_activate().await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| matches!(o.result, Ok(true))));
        assert_eq!(db.list_generations().await.unwrap(), vec!["4:sw-cache-".to_string()]);
    }

    #[tokio::test]
    async fn test_activate_does_not_alias_version_prefixes() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("4:sw-cache-").await.unwrap();
        db.open("40:sw-cache-").await.unwrap();

        let lifecycle = manager(&db, StubNetwork::default(), "4", manifest(&["/index.html"]));
        lifecycle.on_activate().await.unwrap();

        assert_eq!(db.list_generations().await.unwrap(), vec!["4:sw-cache-".to_string()]);
    }

    #[tokio::test]
    async fn test_redeploy_scenario() {
        // Version "3" installed and activated, then "4" deploys with an
        // overlapping manifest.
        let db = CacheDb::open_in_memory().await.unwrap();

        let v3_network = StubNetwork::with_replies(&[("https://app.example.com/index.html", 200, b"v3")]);
        let v3 = manager(&db, v3_network, "3", manifest(&["/index.html"]));
        v3.on_install().await.unwrap();
        v3.on_activate().await.unwrap();

        let v4_network = StubNetwork::with_replies(&[
            ("https://app.example.com/index.html", 200, b"v4"),
            ("https://app.example.com/app.js", 200, b"js"),
        ]);
        let v4 = manager(&db, v4_network, "4", manifest(&["/index.html", "/app.js"]));
        v4.on_install().await.unwrap();
        v4.on_activate().await.unwrap();

        assert_eq!(db.list_generations().await.unwrap(), vec!["4:sw-cache-".to_string()]);
        assert_eq!(db.count_responses("4:sw-cache-").await.unwrap(), 2);

        let hit = db
            .match_response(MatchScope::Generation("4:sw-cache-"), "GET", "https://app.example.com/index.html")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.body, b"v4");
    }

    /// Store wrapper whose deletes fail for one named generation.
    struct FlakyStore {
        inner: CacheDb,
        failing: String,
    }

    #[async_trait]
    impl CacheStore for FlakyStore {
        async fn open(&self, generation: &str) -> Result<(), Error> {
            self.inner.open(generation).await
        }

        async fn list_generations(&self) -> Result<Vec<String>, Error> {
            self.inner.list_generations().await
        }

        async fn delete_generation(&self, generation: &str) -> Result<bool, Error> {
            if generation == self.failing {
                return Err(Error::StorageUnavailable("delete refused".into()));
            }
            self.inner.delete_generation(generation).await
        }

        async fn put_responses(&self, generation: &str, responses: &[CachedResponse]) -> Result<(), Error> {
            self.inner.put_responses(generation, responses).await
        }

        async fn match_response(
            &self, scope: MatchScope<'_>, method: &str, url: &str,
        ) -> Result<Option<CachedResponse>, Error> {
            self.inner.match_response(scope, method, url).await
        }

        async fn count_responses(&self, generation: &str) -> Result<u64, Error> {
            self.inner.count_responses(generation).await
        }
    }

    #[tokio::test]
    async fn test_activate_tolerates_individual_delete_failures() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("2:sw-cache-").await.unwrap();
        db.open("3:sw-cache-").await.unwrap();
        db.open("4:sw-cache-").await.unwrap();

        let store = FlakyStore { inner: db.clone(), failing: "2:sw-cache-".into() };
        let lifecycle = CacheLifecycleManager::new(
            Arc::new(store),
            Arc::new(StubNetwork::default()),
            "4",
            manifest(&["/index.html"]),
            4,
        );

        let outcomes = lifecycle.on_activate().await.unwrap();
        assert_eq!(outcomes.len(), 2);

        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.generation.as_str())
            .collect();
        assert_eq!(failed, vec!["2:sw-cache-"]);

        // The survivor set: current plus the one that refused to die.
        let remaining = db.list_generations().await.unwrap();
        assert_eq!(remaining, vec!["2:sw-cache-".to_string(), "4:sw-cache-".to_string()]);
    }

    #[tokio::test]
    async fn test_install_does_not_fetch_beyond_manifest() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = StubNetwork::with_replies(&[("https://app.example.com/index.html", 200, b"<html>")]);
        let lifecycle = manager(&db, network, "4", manifest(&["/index.html"]));

        lifecycle.on_install().await.unwrap();
        assert_eq!(lifecycle.network.calls(), 1);
    }
}
