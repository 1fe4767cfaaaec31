//! Catalog listing extraction.

use super::rules::{
    all_texts, find_year, first_attr, first_text, parse_leading_f32, slug_from_url,
};
use super::{
    absolutize, CatalogItem, CatalogPage, ContentKind, GENRE_PLACEHOLDER, SYNOPSIS_PLACEHOLDER,
};
use chrono::{Datelike, Utc};
use scraper::{Html, Selector};

/// Candidate item containers, tried as one combined selector. The target
/// markup is not under our control, so this casts a wide net.
const ITEM_CONTAINERS: &str =
    ".movie-item, .content-item, .film-item, .ml-item, article.item, article.movie";

const TITLE_CHAIN: &[&str] = &["h2.title", "h3.title", ".title", ".name", "h2 a", "h3 a"];
const LINK_CHAIN: &[&str] = &["a"];
const POSTER_CHAIN: &[&str] = &[".poster img", ".thumb img", "img"];
const YEAR_CHAIN: &[&str] = &[".year", ".release-year", ".meta .year", ".meta span"];
const RATING_CHAIN: &[&str] = &[".rating", ".imdb", ".score", ".vote"];
const SYNOPSIS_CHAIN: &[&str] = &[".synopsis", ".description", ".excerpt"];
const GENRE_CHAIN: &[&str] = &[".genres a", ".genre", ".category a"];

/// Classes that mark an item as a series rather than a movie.
const SERIES_MARKERS: &[&str] = &["series", "tvshows", "tv-show", "show"];

/// Pagination indicators scanned for the highest page number.
const PAGINATION_CHAIN: &[&str] = &[".pagination a", ".pagination span", ".page-numbers"];

/// Extract a catalog listing page.
///
/// Zero matching containers yields an empty item list and one total page;
/// missing fields fall back to their documented defaults.
pub fn extract_catalog(html: &str, origin: &str, page: u32) -> CatalogPage {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let mut items = Vec::new();
    if let Ok(container_sel) = Selector::parse(ITEM_CONTAINERS) {
        for el in doc.select(&container_sel) {
            items.push(extract_item(el, origin));
        }
    }

    let total_pages = all_texts(root, PAGINATION_CHAIN)
        .iter()
        .filter_map(|t| t.parse::<u32>().ok())
        .max()
        .unwrap_or(1);

    CatalogPage {
        total_items: items.len(),
        items,
        page,
        total_pages,
    }
}

fn extract_item(el: scraper::ElementRef<'_>, origin: &str) -> CatalogItem {
    let title = first_text(el, TITLE_CHAIN)
        .or_else(|| first_attr(el, LINK_CHAIN, &["title"]))
        .unwrap_or_else(|| "Untitled".to_string());

    let detail_url = first_attr(el, LINK_CHAIN, &["href"])
        .map(|href| absolutize(&href, origin))
        .unwrap_or_default();

    let poster_url = first_attr(el, POSTER_CHAIN, &["src", "data-src"])
        .map(|src| absolutize(&src, origin))
        .unwrap_or_default();

    let release_year = first_text(el, YEAR_CHAIN)
        .as_deref()
        .and_then(find_year)
        .unwrap_or_else(|| Utc::now().year());

    let rating = first_text(el, RATING_CHAIN)
        .as_deref()
        .and_then(parse_leading_f32);

    let synopsis =
        first_text(el, SYNOPSIS_CHAIN).unwrap_or_else(|| SYNOPSIS_PLACEHOLDER.to_string());

    let mut genres = all_texts(el, GENRE_CHAIN);
    if genres.is_empty() {
        genres.push(GENRE_PLACEHOLDER.to_string());
    }

    let kind = classify_kind(el);

    // Identifier embeds the scrape instant and is not stable across runs.
    let id = format!(
        "{}-{}",
        slug_from_url(&detail_url, &title),
        Utc::now().timestamp_millis()
    );

    CatalogItem {
        id,
        title,
        kind,
        release_year,
        poster_url,
        detail_url,
        rating,
        synopsis,
        genres,
    }
}

/// An item is a series when it or any descendant carries a series marker
/// class; everything else is a movie.
fn classify_kind(el: scraper::ElementRef<'_>) -> ContentKind {
    if el
        .value()
        .classes()
        .any(|c| SERIES_MARKERS.contains(&c))
    {
        return ContentKind::Series;
    }
    let marker = SERIES_MARKERS
        .iter()
        .map(|m| format!(".{m}"))
        .collect::<Vec<_>>()
        .join(", ");
    if let Ok(sel) = Selector::parse(&marker) {
        if el.select(&sel).next().is_some() {
            return ContentKind::Series;
        }
    }
    ContentKind::Movie
}
