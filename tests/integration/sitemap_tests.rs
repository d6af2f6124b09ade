//! Integration tests for sitemap generation

use chrono::{TimeZone, Utc};
use sitemap_ripple::crawler::Coordinator;
use sitemap_ripple::output::{generate_sitemap, write_sitemap, SitemapOptions};
use sitemap_ripple::service::{PageInput, SitemapService, SitemapSource};
use sitemap_ripple::storage::MemoryStateStore;
use sitemap_ripple::{ChangeFrequency, HttpBatchWorker, PageRecord, SitemapError};
use std::time::Duration;
use tempfile::TempDir;

fn service() -> SitemapService<HttpBatchWorker, MemoryStateStore> {
    let worker = HttpBatchWorker::new("SitemapGenerator/1.0", Duration::from_secs(5)).unwrap();
    SitemapService::new(Coordinator::new(worker, MemoryStateStore::new()))
}

fn fixed_options() -> SitemapOptions {
    SitemapOptions {
        default_lastmod: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        ..Default::default()
    }
}

/// The `<loc>` values of a document, in order
fn locs(xml: &str) -> Vec<String> {
    xml.split("<loc>")
        .skip(1)
        .filter_map(|part| part.split("</loc>").next())
        .map(str::to_string)
        .collect()
}

#[test]
fn test_data_uri_images_are_dropped() {
    let pages: Vec<PageInput> = serde_json::from_str(
        r#"[{
            "url": "https://example.com/gallery",
            "changefreq": "monthly",
            "priority": 0.6,
            "images": [
                "data:image/png;base64,iVBORw0KGgo=",
                "https://example.com/photos/1.jpg",
                "https://example.com/photos/1.jpg"
            ]
        }]"#,
    )
    .unwrap();

    let document = service()
        .generate_sitemap(SitemapSource::Pages {
            urls: pages,
            options: fixed_options(),
        })
        .unwrap();

    assert!(document
        .xml
        .contains(r#"xmlns:image="http://www.google.com/schemas/sitemap-image/1.1""#));
    assert_eq!(document.xml.matches("<image:image>").count(), 1);
    assert!(document
        .xml
        .contains("<image:loc>https://example.com/photos/1.jpg</image:loc>"));
    assert!(!document.xml.contains("base64"));
}

#[test]
fn test_duplicate_urls_merge_into_one_entry() {
    let mut first = PageRecord::stub("https://example.com/blog", ChangeFrequency::Weekly, 0.8);
    first.last_modified = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    first.images = Some(vec!["https://example.com/a.png".to_string()]);

    let mut second = PageRecord::stub("https://EXAMPLE.com/blog/?page=2", ChangeFrequency::Daily, 0.5);
    second.last_modified = Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
    second.images = Some(vec!["https://example.com/b.png".to_string()]);

    let xml = generate_sitemap(&[first, second], &fixed_options()).unwrap();

    assert_eq!(locs(&xml), vec!["https://example.com/blog/".to_string()]);
    assert!(xml.contains("<lastmod>2024-02-01T00:00:00.000Z</lastmod>"));
    assert!(xml.contains("<changefreq>daily</changefreq>"));
    assert_eq!(xml.matches("<image:loc>").count(), 2);
}

#[test]
fn test_no_duplicate_locs() {
    let pages: Vec<PageRecord> = [
        "https://example.com",
        "https://example.com/",
        "https://example.com/#top",
        "https://example.com/about",
        "https://example.com/about?x=1",
    ]
    .iter()
    .map(|url| PageRecord::stub(*url, ChangeFrequency::Weekly, 0.7))
    .collect();

    let xml = generate_sitemap(&pages, &fixed_options()).unwrap();
    assert_eq!(
        locs(&xml),
        vec![
            "https://example.com/".to_string(),
            "https://example.com/about/".to_string()
        ]
    );
}

#[test]
fn test_pretty_and_compact_list_the_same_urls() {
    let pages: Vec<PageRecord> = (0..5)
        .map(|i| {
            PageRecord::stub(
                format!("https://example.com/page-{}", i),
                ChangeFrequency::Weekly,
                0.5,
            )
        })
        .collect();

    let pretty = generate_sitemap(&pages, &fixed_options()).unwrap();
    let compact = generate_sitemap(
        &pages,
        &SitemapOptions {
            pretty: false,
            ..fixed_options()
        },
    )
    .unwrap();

    assert_ne!(pretty, compact);
    assert!(pretty.lines().count() > 5);
    assert_eq!(compact.lines().count(), 1);
    assert_eq!(locs(&pretty), locs(&compact));
}

#[test]
fn test_special_characters_are_escaped() {
    let pages = vec![PageRecord::stub(
        "https://example.com/q&a",
        ChangeFrequency::Weekly,
        0.5,
    )];
    let xml = generate_sitemap(&pages, &fixed_options()).unwrap();
    assert!(xml.contains("<loc>https://example.com/q&amp;a/</loc>"));
}

#[test]
fn test_no_urls_is_rejected() {
    let err = service()
        .generate_sitemap(SitemapSource::Pages {
            urls: Vec::new(),
            options: SitemapOptions::default(),
        })
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid input: No URLs provided. Cannot generate sitemap."
    );
}

#[test]
fn test_unknown_crawl_is_rejected() {
    let err = service()
        .generate_sitemap(SitemapSource::Crawl {
            id: "crawl-unknown".to_string(),
            options: SitemapOptions::default(),
        })
        .unwrap_err();
    assert!(matches!(err, SitemapError::CrawlNotFound(_)));
}

#[test]
fn test_write_sitemap_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sitemap.xml");

    let pages = vec![PageInput::Url("https://example.com/".to_string())];
    let document = service()
        .generate_sitemap(SitemapSource::Pages {
            urls: pages,
            options: fixed_options(),
        })
        .unwrap();
    write_sitemap(&path, &document.xml).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(written.contains("<lastmod>2024-05-01T12:00:00.000Z</lastmod>"));
    assert!(written.contains("<changefreq>weekly</changefreq>"));
    assert!(written.contains("<priority>0.7</priority>"));
}
