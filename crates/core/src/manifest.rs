//! The asset manifest: the fixed list of URLs the application needs offline.
//!
//! Manifest entries are written as absolute URLs or as paths relative to the
//! deployment scope. Resolution happens once at startup; at runtime the
//! manifest is an ordered list of absolute URLs plus a membership test.

use crate::Error;
use url::Url;

/// Resolve a manifest or wire URL against the deployment scope.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Join relative references against the scope origin
/// 3. Remove fragment (#...)
/// 4. Keep query string intact
///
/// Only http and https URLs are admitted.
pub fn resolve_url(scope: &Url, input: &str) -> Result<Url, Error> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty URL".into()));
    }

    let mut resolved = scope
        .join(trimmed)
        .map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;

    match resolved.scheme() {
        "http" | "https" => {}
        scheme => return Err(Error::InvalidUrl(format!("unsupported scheme: {scheme}"))),
    }

    resolved.set_fragment(None);

    Ok(resolved)
}

/// The ordered set of URLs that must be present in a generation after a
/// successful install.
#[derive(Debug, Clone)]
pub struct AssetManifest {
    scope: Url,
    entries: Vec<Url>,
}

impl AssetManifest {
    /// Resolve raw manifest entries against the deployment scope.
    pub fn resolve(scope: &Url, entries: &[String]) -> Result<Self, Error> {
        let entries = entries
            .iter()
            .map(|entry| resolve_url(scope, entry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { scope: scope.clone(), entries })
    }

    /// The deployment scope the manifest was resolved against.
    pub fn scope(&self) -> &Url {
        &self.scope
    }

    /// Resolved entries, in manifest order.
    pub fn entries(&self) -> &[Url] {
        &self.entries
    }

    /// Whether the URL is a manifest member.
    pub fn contains(&self, url: &Url) -> bool {
        self.entries.iter().any(|entry| entry == url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
