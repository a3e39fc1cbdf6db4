//! SQLite-backed persistent store
//!
//! Three tables: `articles` (one row per tracked canonical URL), `versions`
//! (append-only revisions), and `blobs` (content-addressed article text,
//! deduplicated by SHA-256). Uses a `Mutex<Connection>` for thread safety and
//! WAL mode for the on-disk database; [`Database::in_memory`] backs tests.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::{Article, DiffInfo, Version};

/// Fields for a version about to be inserted.
pub struct NewVersion<'a> {
    pub article_id: i64,
    pub blob_hash: &'a str,
    pub title: &'a str,
    pub byline: &'a str,
    pub date: DateTime<Utc>,
    pub diff_info: Option<DiffInfo>,
}

/// Row counts for the `stats` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub articles: usize,
    pub versions: usize,
    pub blobs: usize,
}

/// Handle to the article/version/blob store.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.create_schema()?;

        tracing::info!(path = %path.display(), "store opened");
        Ok(db)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.create_schema()?;
        Ok(db)
    }

    fn create_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                url TEXT NOT NULL UNIQUE,
                created TEXT NOT NULL,
                last_check TEXT,
                last_update TEXT
            );

            CREATE TABLE IF NOT EXISTS blobs (
                hash TEXT PRIMARY KEY,
                content BLOB NOT NULL
            );

            CREATE TABLE IF NOT EXISTS versions (
                id INTEGER PRIMARY KEY,
                article_id INTEGER NOT NULL REFERENCES articles(id),
                blob_hash TEXT NOT NULL REFERENCES blobs(hash),
                boring INTEGER NOT NULL DEFAULT 0,
                title TEXT NOT NULL,
                byline TEXT NOT NULL,
                date TEXT NOT NULL,
                chars_added INTEGER,
                chars_removed INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_versions_article_date
                ON versions(article_id, date);
            "#,
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Articles
    // ------------------------------------------------------------------

    pub fn article_exists(&self, url: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM articles WHERE url = ?1)",
            params![url],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Insert a newly discovered article with empty history. Idempotent:
    /// an already-tracked URL is left untouched.
    pub fn insert_article(&self, url: &str, created: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO articles (url, created) VALUES (?1, ?2)",
            params![url, created.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn all_articles(&self) -> Result<Vec<Article>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, url, created, last_check, last_update FROM articles")?;
        let articles = stmt
            .query_map([], |row| {
                Ok(Article {
                    id: row.get(0)?,
                    url: row.get(1)?,
                    created: parse_ts(2, row.get(2)?)?,
                    last_check: parse_opt_ts(3, row.get(3)?)?,
                    last_update: parse_opt_ts(4, row.get(4)?)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(articles)
    }

    pub fn get_article(&self, url: &str) -> Result<Option<Article>> {
        let conn = self.conn.lock().unwrap();
        let article = conn
            .query_row(
                "SELECT id, url, created, last_check, last_update FROM articles WHERE url = ?1",
                params![url],
                |row| {
                    Ok(Article {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        created: parse_ts(2, row.get(2)?)?,
                        last_check: parse_opt_ts(3, row.get(3)?)?,
                        last_update: parse_opt_ts(4, row.get(4)?)?,
                    })
                },
            )
            .optional()?;
        Ok(article)
    }

    pub fn set_last_check(&self, article_id: i64, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE articles SET last_check = ?1 WHERE id = ?2",
            params![at.to_rfc3339(), article_id],
        )?;
        Ok(())
    }

    pub fn set_last_update(&self, article_id: i64, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE articles SET last_update = ?1 WHERE id = ?2",
            params![at.to_rfc3339(), article_id],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Blobs
    // ------------------------------------------------------------------

    /// Content hash used as the blob key.
    pub fn blob_hash(content: &[u8]) -> String {
        format!("{:x}", Sha256::digest(content))
    }

    /// Store content if its hash is new; either way return the hash.
    pub fn blob_create_or_get(&self, content: &[u8]) -> Result<String> {
        let hash = Self::blob_hash(content);
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO blobs (hash, content) VALUES (?1, ?2)",
            params![hash, content],
        )?;
        Ok(hash)
    }

    pub fn blob_content(&self, hash: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn.lock().unwrap();
        let content = conn
            .query_row(
                "SELECT content FROM blobs WHERE hash = ?1",
                params![hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(content)
    }

    // ------------------------------------------------------------------
    // Versions
    // ------------------------------------------------------------------

    /// Latest stored version of an article by capture date, if any.
    pub fn latest_version(&self, article_id: i64) -> Result<Option<Version>> {
        let conn = self.conn.lock().unwrap();
        let version = conn
            .query_row(
                "SELECT id, article_id, blob_hash, boring, title, byline, date,
                        chars_added, chars_removed
                 FROM versions WHERE article_id = ?1
                 ORDER BY date DESC, id DESC LIMIT 1",
                params![article_id],
                version_from_row,
            )
            .optional()?;
        Ok(version)
    }

    pub fn versions_for(&self, article_id: i64) -> Result<Vec<Version>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, article_id, blob_hash, boring, title, byline, date,
                    chars_added, chars_removed
             FROM versions WHERE article_id = ?1 ORDER BY date ASC, id ASC",
        )?;
        let versions = stmt
            .query_map(params![article_id], version_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(versions)
    }

    pub fn insert_version(&self, version: &NewVersion<'_>) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO versions
                (article_id, blob_hash, boring, title, byline, date, chars_added, chars_removed)
             VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6, ?7)",
            params![
                version.article_id,
                version.blob_hash,
                version.title,
                version.byline,
                version.date.to_rfc3339(),
                version.diff_info.map(|d| d.chars_added as i64),
                version.diff_info.map(|d| d.chars_removed as i64),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    // ------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------

    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock().unwrap();
        let count = |table: &str| -> rusqlite::Result<usize> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get::<_, i64>(0).map(|n| n as usize)
            })
        };
        Ok(StoreStats {
            articles: count("articles")?,
            versions: count("versions")?,
            blobs: count("blobs")?,
        })
    }
}

fn version_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Version> {
    let chars_added: Option<i64> = row.get(7)?;
    let chars_removed: Option<i64> = row.get(8)?;
    let diff_info = match (chars_added, chars_removed) {
        (Some(added), Some(removed)) => Some(DiffInfo {
            chars_added: added as usize,
            chars_removed: removed as usize,
        }),
        _ => None,
    };
    Ok(Version {
        id: row.get(0)?,
        article_id: row.get(1)?,
        blob_hash: row.get(2)?,
        boring: row.get(3)?,
        title: row.get(4)?,
        byline: row.get(5)?,
        date: parse_ts(6, row.get(6)?)?,
        diff_info,
    })
}

fn parse_ts(idx: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_opt_ts(idx: usize, s: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_ts(idx, s)).transpose()
}
