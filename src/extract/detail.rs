//! Content detail extraction.
//!
//! Single-record extraction: one title, one synopsis, and so on — the
//! first match per field wins. Video sources come from two scans: embed
//! iframes mapped to a provider, and media URLs found in inline scripts.

use super::rules::{all_texts, find_year, first_attr, first_text, parse_leading_f32};
use super::{
    absolutize, ContentDetail, LinkKind, Provider, VideoLink, GENRE_PLACEHOLDER,
    SYNOPSIS_PLACEHOLDER,
};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;

const TITLE_CHAIN: &[&str] = &["h1.entry-title", "h1.title", ".movie-title", "h1"];
const SYNOPSIS_CHAIN: &[&str] = &[".synopsis", ".description", ".entry-content p", ".plot"];
const POSTER_CHAIN: &[&str] = &[".poster img", ".movie-poster img", ".thumb img"];
const YEAR_CHAIN: &[&str] = &[".year", ".release-year", ".date", ".meta .year"];
const DURATION_CHAIN: &[&str] = &[".duration", ".runtime"];
const GENRE_CHAIN: &[&str] = &[".genres a", ".sgeneros a", ".genre a", ".genre"];
const RATING_CHAIN: &[&str] = &[".rating .value", ".imdb span", ".rating", ".score"];

/// Absolute media URLs inside inline scripts.
const MEDIA_URL_PATTERN: &str = r#"https?://[^\s"'<>\\]+\.(?:mp4|m3u8|mkv|avi)"#;

/// Extract a content detail page, including its playable sources.
pub fn extract_detail(html: &str, origin: &str) -> ContentDetail {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let title = first_text(root, TITLE_CHAIN).unwrap_or_else(|| "Untitled".to_string());
    let synopsis =
        first_text(root, SYNOPSIS_CHAIN).unwrap_or_else(|| SYNOPSIS_PLACEHOLDER.to_string());
    let poster_url = first_attr(root, POSTER_CHAIN, &["src", "data-src"])
        .map(|src| absolutize(&src, origin))
        .unwrap_or_default();
    let release_year = first_text(root, YEAR_CHAIN).as_deref().and_then(find_year);
    let duration = first_text(root, DURATION_CHAIN).unwrap_or_else(|| "Unknown".to_string());
    let rating = first_text(root, RATING_CHAIN)
        .as_deref()
        .and_then(parse_leading_f32);

    let mut genres = all_texts(root, GENRE_CHAIN);
    if genres.is_empty() {
        genres.push(GENRE_PLACEHOLDER.to_string());
    }

    let mut video_links = Vec::new();
    scan_iframes(&doc, &mut video_links);
    scan_inline_scripts(&doc, &mut video_links);

    ContentDetail {
        title,
        synopsis,
        poster_url,
        release_year,
        duration,
        genres,
        rating,
        video_links,
    }
}

/// Embed iframes, each mapped to a provider by URL substring.
fn scan_iframes(doc: &Html, links: &mut Vec<VideoLink>) {
    let Ok(sel) = Selector::parse("iframe[src]") else {
        return;
    };
    for el in doc.select(&sel) {
        let Some(src) = el.value().attr("src") else {
            continue;
        };
        let src = src.trim();
        if src.is_empty() {
            continue;
        }
        links.push(VideoLink {
            id: format!("link-{}", links.len() + 1),
            provider: Provider::from_url(src),
            quality: "HD".to_string(),
            format: "Embed".to_string(),
            source_url: src.to_string(),
            kind: LinkKind::Iframe,
        });
    }
}

/// Media URLs mentioned in inline script bodies, concatenated and
/// regex-scanned. `.m3u8` is a streaming format, everything else a file.
fn scan_inline_scripts(doc: &Html, links: &mut Vec<VideoLink>) {
    let Ok(sel) = Selector::parse("script") else {
        return;
    };
    let scripts: String = doc
        .select(&sel)
        .map(|el| el.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");

    let Ok(re) = Regex::new(MEDIA_URL_PATTERN) else {
        return;
    };
    let mut seen = HashSet::new();
    for m in re.find_iter(&scripts) {
        let url = m.as_str().to_string();
        if !seen.insert(url.clone()) {
            continue;
        }
        let format = if url.ends_with(".m3u8") {
            "HLS".to_string()
        } else {
            url.rsplit('.')
                .next()
                .unwrap_or("mp4")
                .to_ascii_uppercase()
        };
        links.push(VideoLink {
            id: format!("link-{}", links.len() + 1),
            provider: Provider::from_url(&url),
            quality: "Auto".to_string(),
            format,
            source_url: url,
            kind: LinkKind::Direct,
        });
    }
}
