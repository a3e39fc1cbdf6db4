//! HTML helpers shared by site adapter implementations
//!
//! Front-page link extraction and text extraction with entity decoding.
//! These run on fetched HTML before anything is stored; the stored snapshot
//! is plain text.

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

/// Extract absolute http(s) links from a page.
///
/// Relative hrefs are resolved against `base`. Results are deduplicated and
/// sorted for deterministic output.
pub fn extract_links(html: &str, base: &str) -> Vec<String> {
    let Ok(base_url) = Url::parse(base) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("static selector");

    let mut links = HashSet::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base_url.join(href.trim()) else {
            continue;
        };
        if matches!(resolved.scheme(), "http" | "https") {
            links.insert(resolved.to_string());
        }
    }

    let mut result: Vec<String> = links.into_iter().collect();
    result.sort();
    result
}

/// Inner text of the first element matching a CSS selector, entity-decoded,
/// with inner whitespace collapsed. `None` when nothing matches or the
/// selector is invalid.
pub fn select_text(html: &str, selector: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(selector).ok()?;
    let element = document.select(&selector).next()?;

    let raw: String = element.text().collect::<Vec<_>>().join(" ");
    let decoded = decode_entities(&raw);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Inner text of the first element matching a CSS selector with paragraph
/// structure preserved: each `<p>` child becomes its own line.
pub fn select_paragraphs(html: &str, selector: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let parsed = Selector::parse(selector).ok()?;
    let element = document.select(&parsed).next()?;

    let p_selector = Selector::parse("p").expect("static selector");
    let paragraphs: Vec<String> = element
        .select(&p_selector)
        .filter_map(|p| {
            let raw: String = p.text().collect::<Vec<_>>().join(" ");
            let decoded = decode_entities(&raw);
            let line = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
            (!line.is_empty()).then_some(line)
        })
        .collect();

    if paragraphs.is_empty() {
        // no <p> children; fall back to flat text
        return select_text(html, selector);
    }
    Some(paragraphs.join("\n"))
}

/// Decode HTML entities (named and numeric).
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).to_string()
}
