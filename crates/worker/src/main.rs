//! rmnnt-sw worker entry point.
//!
//! Boots the offline worker on the stdio transport. Logging goes to stderr
//! to avoid interfering with the JSON event protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use url::Url;

use rmnnt_client::{FetchClient, FetchConfig};
use rmnnt_core::cache::CacheDb;
use rmnnt_core::manifest::resolve_url;
use rmnnt_core::{AppConfig, AssetManifest};
use rmnnt_worker::{CacheLifecycleManager, FetchInterceptor, WorkerRuntime, stdio};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;

    tracing::info!(
        version_tag = %config.version_tag,
        manifest_len = config.manifest.len(),
        "starting rmnnt-sw worker on stdio transport"
    );

    let scope = Url::parse(&config.scope)?;
    let manifest = AssetManifest::resolve(&scope, &config.manifest)?;
    let offline_document = resolve_url(&scope, &config.offline_document)?;

    let store = Arc::new(CacheDb::open(&config.db_path).await?);
    let network = Arc::new(FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
    })?);

    let lifecycle = CacheLifecycleManager::new(
        store.clone(),
        network.clone(),
        &config.version_tag,
        manifest.clone(),
        config.prefetch_concurrency,
    );
    let interceptor = FetchInterceptor::new(store, network, &config.version_tag, manifest, offline_document);

    let (runtime, signals) = WorkerRuntime::new(lifecycle, interceptor);

    stdio::run(runtime, signals, scope).await
}
