//! Site adapter capability and registry
//!
//! Each tracked source supplies a [`SiteAdapter`]: feed discovery plus a
//! fetch+parse capability for individual article pages. Adapters are selected
//! through a domain map built at startup; lookup returns an explicit `Option`
//! rather than relying on a thrown-and-caught failure.

pub mod extract;
pub mod generic;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::FetchError;
use crate::models::ParsedPage;

pub use generic::{SelectorAdapter, SelectorSite};

/// Capability interface for one tracked news source.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Host names this adapter is responsible for, lower-case.
    fn domains(&self) -> Vec<String>;

    /// Current article URLs from the source's front pages or feeds.
    async fn feed_urls(&self) -> Result<Vec<String>, FetchError>;

    /// Fetch and parse a single article page.
    ///
    /// Returns [`FetchError::Gone`] when the article was removed upstream;
    /// the caller skips it silently. A parsed page with
    /// `real_article == false` means the URL resolved to something that is
    /// not a genuine article.
    async fn parse(&self, url: &str) -> Result<ParsedPage, FetchError>;
}

/// Domain-to-adapter mapping built at startup.
#[derive(Default)]
pub struct SiteRegistry {
    by_domain: HashMap<String, Arc<dyn SiteAdapter>>,
    adapters: Vec<Arc<dyn SiteAdapter>>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under all of its domains. A later registration
    /// for the same domain replaces the earlier one.
    pub fn register(&mut self, adapter: Arc<dyn SiteAdapter>) {
        for domain in adapter.domains() {
            self.by_domain
                .insert(domain.to_ascii_lowercase(), Arc::clone(&adapter));
        }
        self.adapters.push(adapter);
    }

    /// Resolve the adapter responsible for a URL's host, if any.
    pub fn adapter_for(&self, url: &str) -> Option<Arc<dyn SiteAdapter>> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();
        self.by_domain.get(&host).cloned()
    }

    /// All registered adapters, in registration order.
    pub fn adapters(&self) -> &[Arc<dyn SiteAdapter>] {
        &self.adapters
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
