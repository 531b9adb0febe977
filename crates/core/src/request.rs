//! Request model for intercepted fetches.
//!
//! A request's cache identity is its method plus URL; bodies are ignored.
//! The mode and accept header only matter for the navigation test that
//! drives the offline-document fallback.

use serde::{Deserialize, Serialize};
use url::Url;

/// Request mode, as declared by the client issuing the fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// The request loads a new document.
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

/// A fetch request presented to the worker.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method, uppercase.
    pub method: String,
    /// Absolute request URL.
    pub url: Url,
    /// Declared request mode.
    pub mode: RequestMode,
    /// Declared Accept header, if any.
    pub accept: Option<String>,
}

impl Request {
    /// Create a plain GET request (the shape used for manifest prefetch).
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, mode: RequestMode::NoCors, accept: None }
    }

    /// Create a navigation request for a document.
    pub fn navigate(url: Url) -> Self {
        Self { method: "GET".into(), url, mode: RequestMode::Navigate, accept: Some("text/html".into()) }
    }

    /// Whether this request loads a document.
    ///
    /// True when the mode is navigate, or (for clients that do not declare
    /// a mode) when a GET carries an Accept header naming text/html.
    pub fn is_navigation(&self) -> bool {
        if self.mode == RequestMode::Navigate {
            return true;
        }
        self.method == "GET"
            && self
                .accept
                .as_deref()
                .is_some_and(|accept| accept.to_ascii_lowercase().contains("text/html"))
    }
}
