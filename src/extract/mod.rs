//! Markup extraction — normalized records from rendered catalog HTML.
//!
//! Pure synchronous functions over `scraper`-parsed documents. The
//! `scraper` types are `!Send`, so async callers wrap these in
//! `tokio::task::spawn_blocking`. Extraction never fails on well-formed
//! HTML with zero matches: every field has a documented default and item
//! sequences come back empty.

mod catalog;
mod detail;
mod player;
mod rules;

pub use catalog::extract_catalog;
pub use detail::extract_detail;
pub use player::extract_download_links;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default catalog site origin, overridable via `CATALOG_ORIGIN`.
pub const DEFAULT_ORIGIN: &str = "https://cineverse.stream";

/// Placeholder synopsis when the page carries none.
pub const SYNOPSIS_PLACEHOLDER: &str = "No synopsis available.";

/// Placeholder genre when the page carries none.
pub const GENRE_PLACEHOLDER: &str = "Unknown";

/// Movie or series, classified from a series marker class on the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Movie,
    Series,
}

/// One entry on a catalog listing page.
///
/// The identifier embeds a wall-clock timestamp, so repeated scrapes of
/// the same underlying item yield different identifiers (see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    pub kind: ContentKind,
    pub release_year: i32,
    pub poster_url: String,
    pub detail_url: String,
    pub rating: Option<f32>,
    pub synopsis: String,
    pub genres: Vec<String>,
}

/// A full catalog listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage {
    pub items: Vec<CatalogItem>,
    pub page: u32,
    pub total_pages: u32,
    pub total_items: usize,
}

/// Video hosting service, identified from an embed URL substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    StreamTape,
    VidPlay,
    DoodStream,
    MixDrop,
    UpStream,
    #[serde(rename = "Unknown Provider")]
    Unknown,
}

impl Provider {
    /// Ordered substring checks; first match wins.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        if lower.contains("streamtape") {
            Self::StreamTape
        } else if lower.contains("vidplay") {
            Self::VidPlay
        } else if lower.contains("dood") {
            Self::DoodStream
        } else if lower.contains("mixdrop") {
            Self::MixDrop
        } else if lower.contains("upstream") {
            Self::UpStream
        } else {
            Self::Unknown
        }
    }
}

/// How a video link is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Iframe,
    Direct,
}

/// A playable source discovered on a detail page.
///
/// Quality and format are constant placeholders — the media itself is
/// never probed. Identifiers are scoped to the containing response only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoLink {
    pub id: String,
    pub provider: Provider,
    pub quality: String,
    pub format: String,
    pub source_url: String,
    pub kind: LinkKind,
}

/// A single title's detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetail {
    pub title: String,
    pub synopsis: String,
    pub poster_url: String,
    pub release_year: Option<i32>,
    pub duration: String,
    pub genres: Vec<String>,
    pub rating: Option<f32>,
    pub video_links: Vec<VideoLink>,
}

/// Media URLs observed while loading a player page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedLinks {
    pub video_urls: Vec<String>,
    pub download_links: Vec<String>,
    pub extracted_at: DateTime<Utc>,
}

/// Whether a URL points at a media file we care about.
pub fn is_media_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains(".mp4") || lower.contains(".m3u8") || lower.contains(".mkv") || lower.contains(".avi")
}

/// Resolve a scraped URL against the site origin.
///
/// Anything that parses as an absolute URL passes through verbatim;
/// everything else gets the origin prefixed.
pub(crate) fn absolutize(raw: &str, origin: &str) -> String {
    if raw.is_empty() || url::Url::parse(raw).is_ok() {
        return raw.to_string();
    }
    let base = origin.trim_end_matches('/');
    if raw.starts_with('/') {
        format!("{base}{raw}")
    } else {
        format!("{base}/{raw}")
    }
}
