// Core data structures for the newswatch revision tracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical URLs longer than this are never tracked (store column width).
pub const MAX_URL_LEN: usize = 255;

/// A tracked article, identified by its canonical URL.
///
/// An article with zero stored versions is valid: it has been discovered but
/// not yet successfully fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Store row id
    pub id: i64,
    /// Canonical URL (query string and fragment stripped)
    pub url: String,
    /// When the article was first discovered
    pub created: DateTime<Utc>,
    /// Last time a fetch was attempted, `None` if never checked
    pub last_check: Option<DateTime<Utc>>,
    /// Last time a non-boring revision was stored, `None` if never
    pub last_update: Option<DateTime<Utc>>,
}

impl Article {
    /// Minutes since the last fetch attempt, `None` if never checked.
    pub fn minutes_since_check(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_check.map(|t| (now - t).num_minutes())
    }

    /// Minutes since the last stored revision, falling back to the
    /// discovery time for articles that never produced one.
    pub fn minutes_since_update(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_update.unwrap_or(self.created)).num_minutes()
    }
}

/// A stored revision of an article's content.
///
/// Versions are append-only and totally ordered by `date`; the latest version
/// is the maximum by capture date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: i64,
    pub article_id: i64,
    /// Content-addressed reference into the blob store
    pub blob_hash: String,
    /// Always false for stored versions; boring changes are never persisted
    pub boring: bool,
    pub title: String,
    pub byline: String,
    /// Capture timestamp
    pub date: DateTime<Utc>,
    /// Delta against the immediately preceding version, absent for an
    /// article's first-ever version
    pub diff_info: Option<DiffInfo>,
}

/// Summary of an edit as counts of added and removed characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffInfo {
    pub chars_added: usize,
    pub chars_removed: usize,
}

/// Result of fetching and parsing a tracked URL via its site adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedPage {
    pub url: String,
    pub title: String,
    pub byline: String,
    /// Rendered article text. By adapter convention the first line is a
    /// date/header line; the boring classifier ignores it.
    pub text: String,
    /// False when the page parsed but is not a genuine article
    /// (e.g. a listing page misidentified as one)
    pub real_article: bool,
}
