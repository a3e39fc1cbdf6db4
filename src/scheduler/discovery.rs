//! Article URL discovery
//!
//! Walks every registered site adapter's feeds, canonicalizes the URLs they
//! yield, and returns the deduplicated set. A failing adapter is logged and
//! skipped; it never blocks discovery for the other sites.

use std::collections::BTreeSet;

use crate::sites::SiteRegistry;

/// Canonical form of an article URL: whitespace trimmed, query string and
/// fragment dropped. Two URLs differing only in tracking parameters collapse
/// to the same tracked article.
pub fn canonicalize_url(url: &str) -> String {
    let url = url.trim();
    let url = url.split('?').next().unwrap_or(url);
    let url = url.split('#').next().unwrap_or(url);
    url.to_string()
}

/// Collect canonical article URLs from every adapter's feeds.
///
/// Deterministic output: URLs are deduplicated and sorted. Per-adapter
/// failures are logged at warn and skipped.
pub async fn discover_all(registry: &SiteRegistry) -> Vec<String> {
    let mut urls = BTreeSet::new();

    for adapter in registry.adapters() {
        let domains = adapter.domains().join(",");
        match adapter.feed_urls().await {
            Ok(found) => {
                tracing::debug!(domains = %domains, count = found.len(), "feed scan complete");
                for url in found {
                    urls.insert(canonicalize_url(&url));
                }
            }
            Err(e) => {
                tracing::warn!(domains = %domains, error = %e, "feed scan failed, skipping site");
            }
        }
    }

    urls.into_iter().collect()
}
