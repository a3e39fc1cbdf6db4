//! newswatch: tracks how news articles change after publication
//!
//! A scheduler discovers article URLs from configured site feeds, fetches the
//! ones that are due on a priority schedule, and stores a new plain-text
//! version whenever the content meaningfully changed. Trivial changes
//! (whitespace reflow, rotating date lines, charset re-encodings) are
//! classified as boring and never stored.
//!
//! # Architecture
//!
//! - [`sites`]: per-source adapters behind the [`sites::SiteAdapter`] trait
//! - [`fetch`]: shared HTTP client with charset-aware decoding
//! - [`scheduler`]: discovery, check-frequency policy, and the update pipeline
//! - [`diff`]: boring-change classification and edit summarization
//! - [`storage`]: SQLite store of articles, versions, and deduplicated blobs

pub mod config;
pub mod diff;
pub mod error;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod scheduler;
pub mod sites;
pub mod storage;

pub use config::Config;
pub use error::{Error, FetchError, Result};
pub use models::{Article, DiffInfo, ParsedPage, Version};
pub use scheduler::{RunOptions, RunReport, Scheduler};
pub use storage::Database;

/// Commonly used types.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, FetchError, Result};
    pub use crate::models::{Article, DiffInfo, ParsedPage, Version};
    pub use crate::scheduler::{RunOptions, RunReport, Scheduler};
    pub use crate::sites::{SiteAdapter, SiteRegistry};
    pub use crate::storage::Database;
}
