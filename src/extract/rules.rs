//! Selector fallback chains.
//!
//! Each field is extracted by an explicit ordered list of candidate CSS
//! selectors tried in sequence; the first non-empty result wins. Invalid
//! candidate selectors are skipped rather than treated as errors, so a
//! chain degrades instead of failing.

use regex::Regex;
use scraper::{ElementRef, Selector};

/// First non-empty trimmed text produced by any selector in the chain.
pub(crate) fn first_text(scope: ElementRef<'_>, chain: &[&str]) -> Option<String> {
    for candidate in chain {
        let Ok(sel) = Selector::parse(candidate) else {
            continue;
        };
        for el in scope.select(&sel) {
            let text = collapse_ws(&el.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// First non-empty attribute value, trying attributes in order per element.
pub(crate) fn first_attr(scope: ElementRef<'_>, chain: &[&str], attrs: &[&str]) -> Option<String> {
    for candidate in chain {
        let Ok(sel) = Selector::parse(candidate) else {
            continue;
        };
        for el in scope.select(&sel) {
            for attr in attrs {
                if let Some(value) = el.value().attr(attr) {
                    let value = value.trim();
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }
    None
}

/// All non-empty texts from the first selector in the chain that matches
/// anything. Preserves document order.
pub(crate) fn all_texts(scope: ElementRef<'_>, chain: &[&str]) -> Vec<String> {
    for candidate in chain {
        let Ok(sel) = Selector::parse(candidate) else {
            continue;
        };
        let texts: Vec<String> = scope
            .select(&sel)
            .map(|el| collapse_ws(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())
            .collect();
        if !texts.is_empty() {
            return texts;
        }
    }
    Vec::new()
}

/// Collapse runs of whitespace to single spaces and trim.
pub(crate) fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Leading-float parse, mirroring how the site's numbers are formatted
/// ("8.5/10" parses as 8.5; "n/a" parses as nothing).
pub(crate) fn parse_leading_f32(text: &str) -> Option<f32> {
    let trimmed = text.trim();
    let end = trimmed
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit() || *c == '.')
        .last()
        .map(|(i, c)| i + c.len_utf8())?;
    trimmed[..end].parse().ok()
}

/// First plausible 4-digit year anywhere in the text.
pub(crate) fn find_year(text: &str) -> Option<i32> {
    let Ok(re) = Regex::new(r"\b(?:19|20)\d{2}\b") else {
        return None;
    };
    re.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Lowercase, alphanumerics kept, everything else collapsed to dashes.
pub(crate) fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Slug for an item, preferring the last path segment of its detail URL.
pub(crate) fn slug_from_url(detail_url: &str, title: &str) -> String {
    let segment = detail_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("");
    if segment.is_empty() || segment.contains(':') || segment.contains('?') {
        slugify(title)
    } else {
        segment.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_first_text_fallback_order() {
        let doc = Html::parse_document(
            r#"<div><span class="b">second</span><span class="a">first</span></div>"#,
        );
        let root = doc.root_element();
        assert_eq!(
            first_text(root, &[".missing", ".a", ".b"]).as_deref(),
            Some("first")
        );
        assert_eq!(first_text(root, &[".nope"]), None);
    }

    #[test]
    fn test_first_text_skips_empty_matches() {
        let doc = Html::parse_document(
            r#"<div><span class="a">  </span><span class="b">value</span></div>"#,
        );
        let root = doc.root_element();
        // .a matches but is blank, so the chain falls through to .b.
        assert_eq!(first_text(root, &[".a", ".b"]).as_deref(), Some("value"));
    }

    #[test]
    fn test_first_attr_tries_attrs_in_order() {
        let doc = Html::parse_document(r#"<img data-src="/lazy.jpg" src="">"#);
        let root = doc.root_element();
        assert_eq!(
            first_attr(root, &["img"], &["src", "data-src"]).as_deref(),
            Some("/lazy.jpg")
        );
    }

    #[test]
    fn test_invalid_selector_is_skipped() {
        let doc = Html::parse_document(r#"<p class="x">hi</p>"#);
        let root = doc.root_element();
        assert_eq!(first_text(root, &["[[[", ".x"]).as_deref(), Some("hi"));
    }

    #[test]
    fn test_all_texts_first_matching_chain_wins() {
        let doc = Html::parse_document(
            r#"<ul class="genres"><li>Action</li><li>Drama</li></ul><span class="genre">Old</span>"#,
        );
        let root = doc.root_element();
        assert_eq!(
            all_texts(root, &[".genres li", ".genre"]),
            vec!["Action".to_string(), "Drama".to_string()]
        );
    }

    #[test]
    fn test_parse_leading_f32() {
        assert_eq!(parse_leading_f32(" 8.5/10 "), Some(8.5));
        assert_eq!(parse_leading_f32("7"), Some(7.0));
        assert_eq!(parse_leading_f32("IMDB 8.5"), None);
        assert_eq!(parse_leading_f32(""), None);
    }

    #[test]
    fn test_find_year() {
        assert_eq!(find_year("Released 2019, remastered"), Some(2019));
        assert_eq!(find_year("episode 10234"), None);
        assert_eq!(find_year("no year here"), None);
    }

    #[test]
    fn test_slugify_and_slug_from_url() {
        assert_eq!(slugify("The Last Voyage!"), "the-last-voyage");
        assert_eq!(
            slug_from_url("https://site.example/movie/the-last-voyage/", "x"),
            "the-last-voyage"
        );
        assert_eq!(slug_from_url("", "The Last Voyage"), "the-last-voyage");
    }
}
