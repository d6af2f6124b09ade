//! HTML parser for extracting links and sitemap metadata
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow (from <a> tags)
//! - Image references (from <img> tags)
//! - The page's last modification time
//! - Noindex directives

use chrono::{DateTime, NaiveDate, Utc};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Meta tags consulted for the last modification time, in priority order
const LAST_MODIFIED_META: &[(&str, &str)] = &[
    ("name", "last-modified"),
    ("property", "article:modified_time"),
    ("property", "og:updated_time"),
];

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// All links found on the page (absolute URLs, fragments kept)
    pub links: Vec<Url>,

    /// Image URLs (absolute, deduplicated); empty unless requested
    pub images: Vec<String>,

    /// Best known modification time of the page
    pub last_modified: DateTime<Utc>,

    /// The page carries a robots or googlebot noindex directive
    pub noindex: bool,
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Hrefs that do not resolve to an HTTP(S) URL
///
/// # Last Modified
///
/// The first parseable value of `meta[name=last-modified]`,
/// `meta[property=article:modified_time]`, `meta[property=og:updated_time]`
/// and the HTTP `Last-Modified` header wins; otherwise the current time.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The page's URL, used to resolve relative links
/// * `include_images` - Whether to collect `<img src>` references
/// * `last_modified_header` - The response's Last-Modified header, if any
///
/// # Example
///
/// ```
/// use sitemap_ripple::crawler::parse_page;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a><img src="/a.png"></body></html>"#;
/// let page_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_page(html, &page_url, true, None);
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
/// assert_eq!(parsed.images, vec!["https://example.com/a.png".to_string()]);
/// ```
pub fn parse_page(
    html: &str,
    page_url: &Url,
    include_images: bool,
    last_modified_header: Option<&str>,
) -> ParsedPage {
    let document = Html::parse_document(html);

    let links = extract_links(&document, page_url);
    let images = if include_images {
        extract_images(&document, page_url)
    } else {
        Vec::new()
    };
    let last_modified = extract_last_modified(&document)
        .or_else(|| last_modified_header.and_then(parse_timestamp))
        .unwrap_or_else(Utc::now);
    let noindex = has_noindex(&document);

    ParsedPage {
        links,
        images,
        last_modified,
        noindex,
    }
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, page_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, page_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Extracts image URLs, skipping inline data URIs
fn extract_images(document: &Html, page_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut images = Vec::new();

    if let Ok(img_selector) = Selector::parse("img[src]") {
        for element in document.select(&img_selector) {
            let Some(src) = element.value().attr("src") else {
                continue;
            };
            let src = src.trim();
            if src.is_empty() || src.to_lowercase().starts_with("data:") {
                continue;
            }

            if let Ok(absolute) = page_url.join(src) {
                let absolute = absolute.to_string();
                if seen.insert(absolute.clone()) {
                    images.push(absolute);
                }
            }
        }
    }

    images
}

/// Reads the first parseable modification time from the page's meta tags
fn extract_last_modified(document: &Html) -> Option<DateTime<Utc>> {
    let meta_selector = Selector::parse("meta[content]").ok()?;

    for (attribute, wanted) in LAST_MODIFIED_META {
        let found = document
            .select(&meta_selector)
            .filter(|element| {
                element
                    .value()
                    .attr(attribute)
                    .is_some_and(|value| value.eq_ignore_ascii_case(wanted))
            })
            .filter_map(|element| element.value().attr("content"))
            .find_map(parse_timestamp);

        if found.is_some() {
            return found;
        }
    }

    None
}

/// Returns true if a robots or googlebot meta tag contains "noindex"
fn has_noindex(document: &Html) -> bool {
    let Ok(meta_selector) = Selector::parse("meta[name][content]") else {
        return false;
    };

    document.select(&meta_selector).any(|element| {
        let name = element.value().attr("name").unwrap_or("").to_lowercase();
        let content = element.value().attr("content").unwrap_or("").to_lowercase();
        (name == "robots" || name == "googlebot") && content.contains("noindex")
    })
}

/// Parses an RFC 3339, HTTP-date or bare date timestamp
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only hrefs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, page_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match page_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url)
        }
        _ => None,
    }
}
