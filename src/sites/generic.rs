//! Selector-driven site adapter
//!
//! Per-site parsers are external collaborators, but most text-first news
//! sites need nothing beyond "links from this front page, title/body/byline
//! from these selectors". [`SelectorAdapter`] covers that case from
//! configuration alone; sites that need real parsing logic implement
//! [`SiteAdapter`](super::SiteAdapter) directly.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::FetchError;
use crate::fetch::PageFetcher;
use crate::models::ParsedPage;
use crate::normalize::canonicalize;
use crate::sites::{extract, SiteAdapter};

/// Pages whose extracted body is shorter than this are treated as
/// non-articles (listing pages, stubs).
const MIN_BODY_CHARS: usize = 120;

/// Configuration for one selector-driven site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorSite {
    /// Host name this site is tracked under, e.g. "www.example.com"
    pub domain: String,

    /// Front page or feed page to discover article links from
    pub feed_url: String,

    /// CSS selector for the article title
    #[serde(default = "default_title_selector")]
    pub title_selector: String,

    /// CSS selector for the article body
    #[serde(default = "default_body_selector")]
    pub body_selector: String,

    /// CSS selector for the byline, optional
    #[serde(default)]
    pub byline_selector: Option<String>,

    /// Only feed links whose path starts with this prefix are articles
    #[serde(default)]
    pub article_prefix: Option<String>,
}

fn default_title_selector() -> String {
    "h1".to_string()
}

fn default_body_selector() -> String {
    "article".to_string()
}

/// [`SiteAdapter`] implementation driven by a [`SelectorSite`] config entry.
pub struct SelectorAdapter {
    site: SelectorSite,
    fetcher: Arc<PageFetcher>,
}

impl SelectorAdapter {
    pub fn new(site: SelectorSite, fetcher: Arc<PageFetcher>) -> Self {
        Self { site, fetcher }
    }

    /// True when a discovered link belongs to this site's article space.
    fn is_article_link(&self, link: &str) -> bool {
        let Ok(parsed) = Url::parse(link) else {
            return false;
        };
        let host_matches = parsed
            .host_str()
            .is_some_and(|h| h.eq_ignore_ascii_case(&self.site.domain));
        if !host_matches {
            return false;
        }
        match &self.site.article_prefix {
            Some(prefix) => parsed.path().starts_with(prefix.as_str()),
            None => true,
        }
    }
}

#[async_trait]
impl SiteAdapter for SelectorAdapter {
    fn domains(&self) -> Vec<String> {
        vec![self.site.domain.to_ascii_lowercase()]
    }

    async fn feed_urls(&self) -> Result<Vec<String>, FetchError> {
        let html = self.fetcher.fetch(&self.site.feed_url).await?;
        let links = extract::extract_links(&html, &self.site.feed_url);
        Ok(links
            .into_iter()
            .filter(|link| self.is_article_link(link))
            .collect())
    }

    async fn parse(&self, url: &str) -> Result<ParsedPage, FetchError> {
        let html = self.fetcher.fetch(url).await?;

        let Some(title) = extract::select_text(&html, &self.site.title_selector) else {
            return Err(FetchError::Malformed(format!(
                "no title under selector {:?}",
                self.site.title_selector
            )));
        };

        let body = extract::select_paragraphs(&html, &self.site.body_selector);
        let byline = self
            .site
            .byline_selector
            .as_deref()
            .and_then(|sel| extract::select_text(&html, sel))
            .unwrap_or_default();

        let Some(body) = body else {
            // parsed fine but there is no article body here
            return Ok(not_an_article(url, title, byline));
        };
        if body.chars().count() < MIN_BODY_CHARS {
            return Ok(not_an_article(url, title, byline));
        }

        // First line is the header/date line; the boring classifier drops it
        let text = canonicalize(&format!(
            "Retrieved {}\n{}\n{}\n\n{}",
            Utc::now().to_rfc3339(),
            title,
            byline,
            body
        ));

        Ok(ParsedPage {
            url: url.to_string(),
            title,
            byline,
            text,
            real_article: true,
        })
    }
}

fn not_an_article(url: &str, title: String, byline: String) -> ParsedPage {
    ParsedPage {
        url: url.to_string(),
        title,
        byline,
        text: String::new(),
        real_article: false,
    }
}
