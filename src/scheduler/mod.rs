//! Update scheduling and the per-article update pipeline
//!
//! One [`Scheduler::run`] pass discovers new article URLs, picks the tracked
//! articles that are due, and refreshes each one. A failure on one article is
//! logged and never aborts the pass.

pub mod delay;
pub mod discovery;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::diff::{diff_summary, is_boring};
use crate::error::{FetchError, Result};
use crate::models::{Article, ParsedPage, MAX_URL_LEN};
use crate::sites::SiteRegistry;
use crate::storage::{Database, NewVersion};

pub use delay::{update_delay, update_priority};
pub use discovery::{canonicalize_url, discover_all};

/// Options for one scheduler pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Refresh every tracked article regardless of priority.
    pub do_all: bool,
    /// Prepend a marker line with the current time to every snapshot, forcing
    /// each pass to store a version. Pipeline smoke testing only.
    pub fake_diff: bool,
}

/// Outcome counters for one pass, for the closing log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub discovered: usize,
    pub considered: usize,
    pub checked: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Drives discovery and article refreshing against the store.
pub struct Scheduler {
    registry: SiteRegistry,
    db: Arc<Database>,
    diff_deadline: Duration,
}

impl Scheduler {
    pub fn new(registry: SiteRegistry, db: Arc<Database>, diff_deadline: Duration) -> Self {
        Self {
            registry,
            db,
            diff_deadline,
        }
    }

    /// One full pass: discover feeds, then refresh due articles.
    pub async fn run(&self, opts: RunOptions) -> Result<RunReport> {
        let urls = discover_all(&self.registry).await;
        let discovered = self.track_new_urls(&urls)?;

        let mut report = self.update_versions(opts).await?;
        report.discovered = discovered;

        tracing::info!(
            discovered = report.discovered,
            considered = report.considered,
            checked = report.checked,
            updated = report.updated,
            failed = report.failed,
            "pass complete"
        );
        Ok(report)
    }

    /// Register canonical URLs that are not yet tracked. Returns the number
    /// of newly tracked articles.
    pub fn track_new_urls(&self, urls: &[String]) -> Result<usize> {
        let now = Utc::now();
        let mut added = 0;
        for url in urls {
            if url.len() > MAX_URL_LEN {
                tracing::warn!(url = %url, len = url.len(), "url too long, not tracking");
                continue;
            }
            if !self.db.article_exists(url)? {
                self.db.insert_article(url, now)?;
                tracing::info!(url = %url, "tracking new article");
                added += 1;
            }
        }
        Ok(added)
    }

    /// Refresh due articles in priority order.
    async fn update_versions(&self, opts: RunOptions) -> Result<RunReport> {
        let now = Utc::now();
        let articles = self.db.all_articles()?;
        let mut report = RunReport {
            considered: articles.len(),
            ..Default::default()
        };

        // Priority is computed once against a single clock so the ordering
        // is stable while the pass runs
        let mut due: Vec<(f64, Article)> = articles
            .into_iter()
            .map(|a| (update_priority(&a, now), a))
            .filter(|(priority, _)| opts.do_all || *priority > 1.0)
            .collect();
        due.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        for (priority, article) in due {
            // Long passes can outlive the due list; re-check on a fresh clock
            if !opts.do_all && update_priority(&article, Utc::now()) <= 1.0 {
                continue;
            }

            tracing::debug!(url = %article.url, priority, "refreshing article");
            // Record the attempt up front; a crash mid-fetch must not make
            // the same article the top priority forever
            self.db.set_last_check(article.id, Utc::now())?;
            report.checked += 1;

            match self.refresh_article(&article, opts).await {
                Ok(true) => report.updated += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(url = %article.url, error = %e, "article refresh failed");
                }
            }
        }

        Ok(report)
    }

    /// Fetch one article and store a version if its content changed.
    /// Returns whether a version was stored.
    async fn refresh_article(&self, article: &Article, opts: RunOptions) -> Result<bool> {
        let Some(page) = self.load_page(&article.url).await? else {
            return Ok(false);
        };
        self.store_if_changed(article, &page, opts)
    }

    /// Resolve the adapter for a URL and parse the live page. `None` means
    /// there is nothing to store: no adapter, not a real article, or the
    /// page is gone upstream.
    async fn load_page(&self, url: &str) -> Result<Option<ParsedPage>> {
        let Some(adapter) = self.registry.adapter_for(url) else {
            tracing::info!(url = %url, "no site adapter for url");
            return Ok(None);
        };

        match adapter.parse(url).await {
            Ok(page) if page.real_article => Ok(Some(page)),
            Ok(_) => {
                tracing::debug!(url = %url, "not a real article, skipping");
                Ok(None)
            }
            Err(FetchError::Gone) => {
                tracing::debug!(url = %url, "gone upstream, skipping");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn store_if_changed(
        &self,
        article: &Article,
        page: &ParsedPage,
        opts: RunOptions,
    ) -> Result<bool> {
        let now = Utc::now();
        let mut to_store = page.text.clone();
        if opts.fake_diff {
            to_store = format!("~~ FAKE DIFF ~~\n{} ~~ {}", to_store, now.to_rfc3339());
        }

        let previous = self.db.latest_version(article.id)?;
        let diff_info = match &previous {
            Some(prev) => {
                let Some(old_blob) = self.db.blob_content(&prev.blob_hash)? else {
                    return Err(crate::error::Error::Inconsistent(format!(
                        "missing blob {} for article {}",
                        prev.blob_hash, article.id
                    )));
                };
                if is_boring(&old_blob, to_store.as_bytes()) {
                    tracing::debug!(url = %article.url, "change is boring, not storing");
                    return Ok(false);
                }
                let old_text = String::from_utf8_lossy(&old_blob);
                Some(diff_summary(&old_text, &to_store, self.diff_deadline))
            }
            None => None,
        };

        let hash = self.db.blob_create_or_get(to_store.as_bytes())?;
        self.db.insert_version(&NewVersion {
            article_id: article.id,
            blob_hash: &hash,
            title: &page.title,
            byline: &page.byline,
            date: now,
            diff_info,
        })?;
        self.db.set_last_update(article.id, now)?;

        tracing::info!(
            url = %article.url,
            first = previous.is_none(),
            added = diff_info.map(|d| d.chars_added).unwrap_or(0),
            removed = diff_info.map(|d| d.chars_removed).unwrap_or(0),
            "stored new version"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::diff::DEFAULT_DIFF_TIMEOUT;
    use crate::sites::SiteAdapter;

    /// Serves a fixed feed and a per-URL scripted page body.
    struct ScriptedSite {
        domain: &'static str,
        feed: Vec<String>,
        page_text: Mutex<String>,
    }

    impl ScriptedSite {
        fn new(domain: &'static str, feed: &[&str], text: &str) -> Arc<Self> {
            Arc::new(Self {
                domain,
                feed: feed.iter().map(|s| s.to_string()).collect(),
                page_text: Mutex::new(text.to_string()),
            })
        }

        fn set_text(&self, text: &str) {
            *self.page_text.lock().unwrap() = text.to_string();
        }
    }

    #[async_trait]
    impl SiteAdapter for ScriptedSite {
        fn domains(&self) -> Vec<String> {
            vec![self.domain.to_string()]
        }

        async fn feed_urls(&self) -> std::result::Result<Vec<String>, FetchError> {
            Ok(self.feed.clone())
        }

        async fn parse(&self, url: &str) -> std::result::Result<ParsedPage, FetchError> {
            Ok(ParsedPage {
                url: url.to_string(),
                title: "Headline".to_string(),
                byline: "By Reporter".to_string(),
                text: self.page_text.lock().unwrap().clone(),
                real_article: true,
            })
        }
    }

    fn scheduler_with(adapter: Arc<ScriptedSite>) -> Scheduler {
        let mut registry = SiteRegistry::new();
        registry.register(adapter);
        Scheduler::new(
            registry,
            Arc::new(Database::in_memory().unwrap()),
            DEFAULT_DIFF_TIMEOUT,
        )
    }

    const TEXT_V1: &str = "Retrieved now\nHeadline\nBy Reporter\n\nFirst body text.";
    const TEXT_V2: &str = "Retrieved now\nHeadline\nBy Reporter\n\nSecond body rewritten.";

    #[tokio::test]
    async fn test_first_pass_tracks_and_stores_first_version() {
        let site = ScriptedSite::new("n.example.com", &["http://n.example.com/a"], TEXT_V1);
        let sched = scheduler_with(site);

        let report = sched.run(RunOptions::default()).await.unwrap();
        assert_eq!(report.discovered, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.failed, 0);

        let article = sched.db.get_article("http://n.example.com/a").unwrap().unwrap();
        let version = sched.db.latest_version(article.id).unwrap().unwrap();
        assert!(version.diff_info.is_none());
        assert!(article.last_check.is_some());
        assert!(article.last_update.is_some());
    }

    #[tokio::test]
    async fn test_unchanged_page_stores_nothing_new() {
        let site = ScriptedSite::new("n.example.com", &["http://n.example.com/a"], TEXT_V1);
        let sched = scheduler_with(Arc::clone(&site));

        sched.run(RunOptions::default()).await.unwrap();
        let report = sched
            .run(RunOptions {
                do_all: true,
                fake_diff: false,
            })
            .await
            .unwrap();

        assert_eq!(report.updated, 0);
        assert_eq!(sched.db.stats().unwrap().versions, 1);
    }

    #[tokio::test]
    async fn test_real_edit_stores_version_with_diff_info() {
        let site = ScriptedSite::new("n.example.com", &["http://n.example.com/a"], TEXT_V1);
        let sched = scheduler_with(Arc::clone(&site));

        sched.run(RunOptions::default()).await.unwrap();
        site.set_text(TEXT_V2);
        let report = sched
            .run(RunOptions {
                do_all: true,
                fake_diff: false,
            })
            .await
            .unwrap();

        assert_eq!(report.updated, 1);
        let article = sched.db.get_article("http://n.example.com/a").unwrap().unwrap();
        let latest = sched.db.latest_version(article.id).unwrap().unwrap();
        let info = latest.diff_info.unwrap();
        assert!(info.chars_added > 0);
        assert!(info.chars_removed > 0);
    }

    #[tokio::test]
    async fn test_boring_edit_stores_nothing() {
        let site = ScriptedSite::new("n.example.com", &["http://n.example.com/a"], TEXT_V1);
        let sched = scheduler_with(Arc::clone(&site));

        sched.run(RunOptions::default()).await.unwrap();
        // only the first (date) line differs
        site.set_text("Retrieved later\nHeadline\nBy Reporter\n\nFirst body text.");
        let report = sched
            .run(RunOptions {
                do_all: true,
                fake_diff: false,
            })
            .await
            .unwrap();

        assert_eq!(report.updated, 0);
        assert_eq!(sched.db.stats().unwrap().versions, 1);
        assert_eq!(sched.db.stats().unwrap().blobs, 1);
    }

    #[tokio::test]
    async fn test_fake_diff_forces_a_version_every_pass() {
        let site = ScriptedSite::new("n.example.com", &["http://n.example.com/a"], TEXT_V1);
        let sched = scheduler_with(site);
        let opts = RunOptions {
            do_all: true,
            fake_diff: true,
        };

        sched.run(opts).await.unwrap();
        sched.run(opts).await.unwrap();
        assert_eq!(sched.db.stats().unwrap().versions, 2);
    }

    #[tokio::test]
    async fn test_overlong_url_is_not_tracked() {
        let long_url = format!("http://n.example.com/{}", "x".repeat(MAX_URL_LEN));
        let site = ScriptedSite::new("n.example.com", &[], TEXT_V1);
        let sched = scheduler_with(site);

        let added = sched.track_new_urls(&[long_url]).unwrap();
        assert_eq!(added, 0);
        assert_eq!(sched.db.stats().unwrap().articles, 0);
    }

    #[tokio::test]
    async fn test_track_new_urls_is_idempotent() {
        let site = ScriptedSite::new("n.example.com", &[], TEXT_V1);
        let sched = scheduler_with(site);
        let urls = vec!["http://n.example.com/a".to_string()];

        assert_eq!(sched.track_new_urls(&urls).unwrap(), 1);
        assert_eq!(sched.track_new_urls(&urls).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_url_without_adapter_is_skipped() {
        let site = ScriptedSite::new("n.example.com", &[], TEXT_V1);
        let sched = scheduler_with(site);
        sched
            .track_new_urls(&["http://orphan.example.org/a".to_string()])
            .unwrap();

        let report = sched.run(RunOptions::default()).await.unwrap();
        assert_eq!(report.checked, 1);
        assert_eq!(report.updated, 0);
        assert_eq!(report.failed, 0);
    }

    /// Adapter whose parse always fails with a transient error.
    struct FailingSite;

    #[async_trait]
    impl SiteAdapter for FailingSite {
        fn domains(&self) -> Vec<String> {
            vec!["down.example.com".to_string()]
        }

        async fn feed_urls(&self) -> std::result::Result<Vec<String>, FetchError> {
            Ok(vec!["http://down.example.com/a".to_string()])
        }

        async fn parse(&self, _url: &str) -> std::result::Result<ParsedPage, FetchError> {
            Err(FetchError::ServerError(503))
        }
    }

    #[tokio::test]
    async fn test_one_failing_article_does_not_abort_the_pass() {
        let good = ScriptedSite::new("n.example.com", &["http://n.example.com/a"], TEXT_V1);
        let mut registry = SiteRegistry::new();
        registry.register(Arc::new(FailingSite));
        registry.register(good);
        let sched = Scheduler::new(
            registry,
            Arc::new(Database::in_memory().unwrap()),
            DEFAULT_DIFF_TIMEOUT,
        );

        let report = sched.run(RunOptions::default()).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.updated, 1);
    }

    /// Adapter that always reports the page as removed upstream.
    struct GoneSite;

    #[async_trait]
    impl SiteAdapter for GoneSite {
        fn domains(&self) -> Vec<String> {
            vec!["gone.example.com".to_string()]
        }

        async fn feed_urls(&self) -> std::result::Result<Vec<String>, FetchError> {
            Ok(vec!["http://gone.example.com/a".to_string()])
        }

        async fn parse(&self, _url: &str) -> std::result::Result<ParsedPage, FetchError> {
            Err(FetchError::Gone)
        }
    }

    #[tokio::test]
    async fn test_gone_article_is_skipped_silently() {
        let mut registry = SiteRegistry::new();
        registry.register(Arc::new(GoneSite));
        let sched = Scheduler::new(
            registry,
            Arc::new(Database::in_memory().unwrap()),
            DEFAULT_DIFF_TIMEOUT,
        );

        let report = sched.run(RunOptions::default()).await.unwrap();
        assert_eq!(report.checked, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.updated, 0);
    }
}
