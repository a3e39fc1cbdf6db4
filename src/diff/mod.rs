//! Change classification and diff summarization
//!
//! Two snapshots of an article pass through [`boring::is_boring`] first; only
//! meaningful changes reach [`summary::diff_summary`], which reduces the edit
//! to added/removed character counts for storage alongside the new version.

pub mod boring;
pub mod summary;

pub use boring::is_boring;
pub use summary::{diff_summary, DEFAULT_DIFF_TIMEOUT};
