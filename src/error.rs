//! Unified error handling for the newswatch crate
//!
//! Fetch and parse failures carry their own [`FetchError`] type so the
//! scheduler can distinguish a permanently removed page ([`FetchError::Gone`],
//! silently skipped) from transient failures (logged and skipped for the
//! current pass). Everything else folds into the unified [`Error`] enum.

use std::io;
use thiserror::Error;

/// Errors raised while fetching or parsing a single page.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status code other than 410
    #[error("server error: {0}")]
    ServerError(u16),

    /// HTTP 410: the article was removed upstream. Skipped without an
    /// error log.
    #[error("resource gone")]
    Gone,

    /// Request timeout
    #[error("request timeout")]
    Timeout,

    /// Response body could not be decoded to text
    #[error("decoding error: {0}")]
    Decode(String),

    /// URL could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Page fetched but its structure did not match expectations
    #[error("malformed page: {0}")]
    Malformed(String),
}

impl FetchError {
    /// True for the distinguished "removed upstream" signal.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Gone)
    }
}

/// Unified error type for the newswatch crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Fetch or parse failure
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Database errors
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("config error: {0}")]
    Config(String),

    /// Store invariant violations (e.g. a version pointing at a missing blob)
    #[error("store inconsistency: {0}")]
    Inconsistent(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
