//! Diff summarization
//!
//! Computes a character-level diff between two snapshots under a configurable
//! deadline, merges small fragments into coherent edits, and reduces the
//! result to added/removed character counts. Never invoked for boring changes
//! or for an article's first version.

use std::time::Duration;

use similar::{ChangeTag, TextDiff};

use crate::models::DiffInfo;

/// Default cap on diff computation time.
pub const DEFAULT_DIFF_TIMEOUT: Duration = Duration::from_secs(3);

/// Equalities shorter than this, sandwiched between edits, are counted as
/// part of the surrounding edit rather than as unchanged text.
const MERGE_THRESHOLD: usize = 4;

/// Summarize the edit from `old` to `new` as character counts.
///
/// The diff is computed at character granularity with Myers LCS, capped at
/// `deadline` (past the deadline the algorithm falls back to a coarser but
/// still correct split). A cleanup pass folds short equal runs that sit
/// between edits into the edit itself, so a reworded sentence counts as one
/// coherent replacement instead of a scatter of one-character changes.
///
/// # Examples
///
/// ```
/// use newswatch::diff::{diff_summary, DEFAULT_DIFF_TIMEOUT};
///
/// let info = diff_summary("abc", "abcd", DEFAULT_DIFF_TIMEOUT);
/// assert_eq!(info.chars_added, 1);
/// assert_eq!(info.chars_removed, 0);
/// ```
pub fn diff_summary(old: &str, new: &str, deadline: Duration) -> DiffInfo {
    let diff = TextDiff::configure().timeout(deadline).diff_chars(old, new);

    // Coalesce per-character changes into runs of one tag
    let mut runs: Vec<(ChangeTag, String)> = Vec::new();
    for change in diff.iter_all_changes() {
        match runs.last_mut() {
            Some((tag, text)) if *tag == change.tag() => text.push_str(change.value()),
            _ => runs.push((change.tag(), change.value().to_string())),
        }
    }

    summarize(&runs)
}

fn summarize(runs: &[(ChangeTag, String)]) -> DiffInfo {
    let mut info = DiffInfo::default();
    for (idx, (tag, text)) in runs.iter().enumerate() {
        let chars = text.chars().count();
        match tag {
            ChangeTag::Insert => info.chars_added += chars,
            ChangeTag::Delete => info.chars_removed += chars,
            ChangeTag::Equal => {
                // An interior equal run is always flanked by edits (runs of
                // the same tag were coalesced above). Short ones read as part
                // of one larger replacement.
                let interior = idx > 0 && idx + 1 < runs.len();
                if interior && chars < MERGE_THRESHOLD {
                    info.chars_added += chars;
                    info.chars_removed += chars;
                }
            }
        }
    }
    info
}
