//! Check-frequency policy
//!
//! How long to wait between fetches of an article, as a function of how long
//! it has been since the article last changed. Articles that just changed get
//! checked every few minutes; articles stale for a year are effectively
//! retired.

use chrono::{DateTime, Utc};

use crate::models::Article;

const MINUTES_PER_DAY: f64 = 60.0 * 24.0;

/// Desired minutes between checks given the minutes since the last stored
/// change.
///
/// Stepped schedule: recently edited articles are polled aggressively, then
/// polling backs off as the article goes quiet. Past roughly a year the delay
/// is effectively infinite and the article is only reachable via a full pass.
pub fn update_delay(minutes_since_update: f64) -> f64 {
    let days = minutes_since_update / MINUTES_PER_DAY;
    if minutes_since_update < 60.0 * 3.0 {
        15.0
    } else if days < 1.0 {
        60.0
    } else if days < 7.0 {
        180.0
    } else if days < 30.0 {
        MINUTES_PER_DAY * 3.0
    } else if days < 360.0 {
        MINUTES_PER_DAY * 30.0
    } else {
        // effectively never
        MINUTES_PER_DAY * 365.0 * 1e5
    }
}

/// Check priority for an article. Priority above 1.0 means the article is
/// due; never-checked articles sort before everything else.
pub fn update_priority(article: &Article, now: DateTime<Utc>) -> f64 {
    match article.minutes_since_check(now) {
        None => f64::INFINITY,
        Some(since_check) => {
            let since_update = article.minutes_since_update(now) as f64;
            since_check as f64 / update_delay(since_update)
        }
    }
}
