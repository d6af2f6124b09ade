//! Sitemap XML serialization
//!
//! Page records are deduplicated by normalized URL, merged, and written as a
//! `<urlset>` document following the sitemaps.org protocol, with the Google
//! image extension when any page carries images.

use crate::output::pretty::prettify;
use crate::state::PageRecord;
use crate::url::normalize_url;
use crate::{Result, SitemapError};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use url::Url;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
const IMAGE_NS: &str = "http://www.google.com/schemas/sitemap-image/1.1";

/// Message returned when there is nothing to serialize
pub const NO_URLS_MESSAGE: &str = "No URLs provided. Cannot generate sitemap.";

/// Options controlling sitemap output
#[derive(Debug, Clone)]
pub struct SitemapOptions {
    /// Base used to resolve relative page URLs
    pub hostname: Option<String>,

    /// Whether `<image:image>` entries are written
    pub include_images: bool,

    /// Whether the document is indented
    pub pretty: bool,

    /// `<lastmod>` for records without one (falls back to now)
    pub default_lastmod: Option<DateTime<Utc>>,
}

impl Default for SitemapOptions {
    fn default() -> Self {
        Self {
            hostname: None,
            include_images: true,
            pretty: true,
            default_lastmod: None,
        }
    }
}

/// Generates a sitemap document from page records
///
/// # Arguments
///
/// * `pages` - Records in the order they should appear; duplicates are merged
/// * `options` - Output options
///
/// # Returns
///
/// * `Ok(String)` - The XML document
/// * `Err(SitemapError)` - No input, or no record survived filtering
///
/// # Example
///
/// ```
/// use sitemap_ripple::{generate_sitemap, ChangeFrequency, PageRecord, SitemapOptions};
///
/// let pages = vec![PageRecord::stub("https://example.com/", ChangeFrequency::Daily, 1.0)];
/// let xml = generate_sitemap(&pages, &SitemapOptions::default()).unwrap();
/// assert!(xml.contains("<loc>https://example.com/</loc>"));
/// ```
pub fn generate_sitemap(pages: &[PageRecord], options: &SitemapOptions) -> Result<String> {
    if pages.is_empty() {
        return Err(SitemapError::InvalidInput(NO_URLS_MESSAGE.to_string()));
    }

    let base = options
        .hostname
        .as_deref()
        .and_then(|hostname| Url::parse(&normalize_url(hostname)).ok());

    let records = dedupe(pages, base.as_ref());
    if records.is_empty() {
        return Err(SitemapError::Sitemap(
            "No indexable URLs left after filtering".to_string(),
        ));
    }

    let records: Vec<(PageRecord, Vec<String>)> = records
        .into_iter()
        .map(|record| {
            let images = if options.include_images {
                filter_images(record.images.as_deref().unwrap_or_default())
            } else {
                Vec::new()
            };
            (record, images)
        })
        .collect();

    let has_images = records.iter().any(|(_, images)| !images.is_empty());
    let fallback_lastmod = options.default_lastmod.unwrap_or_else(Utc::now);

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push_str(&format!(r#"<urlset xmlns="{}""#, SITEMAP_NS));
    if has_images {
        xml.push_str(&format!(r#" xmlns:image="{}""#, IMAGE_NS));
    }
    xml.push('>');

    for (record, images) in &records {
        write_url(&mut xml, record, images, fallback_lastmod);
    }
    xml.push_str("</urlset>");

    tracing::debug!("Serialized {} sitemap entries", records.len());

    if options.pretty {
        Ok(prettify(&xml))
    } else {
        Ok(xml)
    }
}

fn write_url(xml: &mut String, record: &PageRecord, images: &[String], fallback: DateTime<Utc>) {
    let lastmod = record.last_modified.unwrap_or(fallback);

    xml.push_str("<url>");
    xml.push_str(&format!("<loc>{}</loc>", escape_xml(&record.url)));
    xml.push_str(&format!(
        "<lastmod>{}</lastmod>",
        lastmod.to_rfc3339_opts(SecondsFormat::Millis, true)
    ));
    xml.push_str(&format!(
        "<changefreq>{}</changefreq>",
        record.change_frequency.as_str()
    ));
    xml.push_str(&format!(
        "<priority>{:.1}</priority>",
        record.priority.clamp(0.0, 1.0)
    ));
    for image in images {
        xml.push_str(&format!(
            "<image:image><image:loc>{}</image:loc></image:image>",
            escape_xml(image)
        ));
    }
    xml.push_str("</url>");
}

/// Groups records by normalized URL in first-seen order, merging collisions
fn dedupe(pages: &[PageRecord], base: Option<&Url>) -> Vec<PageRecord> {
    let mut merged: Vec<PageRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for page in pages.iter().filter(|page| !page.noindex) {
        let Some(url) = resolve(&page.url, base) else {
            tracing::warn!("Skipping relative URL without a hostname: {}", page.url);
            continue;
        };

        let mut record = page.clone();
        record.url = url;

        match index.get(&record.url) {
            Some(&position) => merged[position].merge(record),
            None => {
                index.insert(record.url.clone(), merged.len());
                merged.push(record);
            }
        }
    }

    merged
}

/// Turns a page URL into an absolute, normalized one
///
/// Absolute URLs are normalized as they are. Without a scheme the input is
/// resolved against `base`, unless its first segment is the base host
/// (`example.com/about`). Returns `None` for a relative URL with no base.
fn resolve(raw: &str, base: Option<&Url>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if is_absolute(raw) {
        return Some(normalize_url(raw));
    }

    match base {
        Some(base) if starts_with_host(raw, base) => Some(normalize_url(raw)),
        Some(base) => base.join(raw).ok().map(|url| normalize_url(url.as_str())),
        None if raw.starts_with('/') || raw.starts_with('.') => None,
        None => Some(normalize_url(raw)),
    }
}

fn is_absolute(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => url.has_host() || url.cannot_be_a_base(),
        Err(_) => false,
    }
}

fn starts_with_host(raw: &str, base: &Url) -> bool {
    let Some(host) = base.host_str() else {
        return false;
    };
    let authority = match base.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    let first = raw.split(['/', '?', '#']).next().unwrap_or_default();
    first.eq_ignore_ascii_case(&authority)
}

/// Drops inline and data-URI images, then dedupes
fn filter_images(images: &[String]) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    for image in images {
        let image = image.trim();
        if image.is_empty()
            || image.starts_with("data:")
            || image.contains("<svg")
            || image.contains(";base64,")
        {
            continue;
        }
        if !kept.iter().any(|k| k == image) {
            kept.push(image.to_string());
        }
    }
    kept
}

/// Escapes the five XML special characters
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
