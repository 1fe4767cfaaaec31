//! Player-page download link extraction.
//!
//! Anchors pointing at video files, or marked with a `download`
//! attribute, collected verbatim. Unlike the detail extractor this does
//! NOT resolve relative URLs — preserved behavior difference, see
//! DESIGN.md.

use scraper::{Html, Selector};
use std::collections::HashSet;

/// Collect downloadable anchor hrefs from a rendered player page.
pub fn extract_download_links(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for el in doc.select(&sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() {
            continue;
        }
        let lower = href.to_ascii_lowercase();
        let is_file = lower.contains(".mp4") || lower.contains(".mkv");
        let is_download = el.value().attr("download").is_some();
        if (is_file || is_download) && seen.insert(href.to_string()) {
            links.push(href.to_string());
        }
    }
    links
}
