//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run crawls
//! end-to-end through the service.

use sitemap_ripple::crawler::{HttpBatchWorker, RoundOutcome, DEFAULT_USER_AGENT};
use sitemap_ripple::output::SitemapOptions;
use sitemap_ripple::service::{CrawlStatus, SitemapService, SitemapSource};
use sitemap_ripple::storage::{MemoryStateStore, SqliteStateStore, StateStore};
use sitemap_ripple::{CrawlOptions, PageRecord};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// Mounts an HTML page at `route`
async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

fn service<S: StateStore>(store: S) -> SitemapService<HttpBatchWorker, S> {
    SitemapService::with_http(DEFAULT_USER_AGENT, Duration::from_secs(5), store)
        .expect("Failed to create service")
}

fn options() -> CrawlOptions {
    CrawlOptions {
        retry_backoff: 10,
        ..Default::default()
    }
}

fn urls(records: &[PageRecord]) -> Vec<String> {
    records.iter().map(|r| r.url.clone()).collect()
}

#[tokio::test]
async fn test_crawl_single_site() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><body>
            <a href="/a">A</a>
            <a href="/a#section">A section</a>
            <a href="/logo.png">Logo</a>
            <a href="https://elsewhere.example/">Elsewhere</a>
        </body></html>"#,
    )
    .await;
    mount_page(&server, "/a/", r#"<html><body><a href="/">Home</a></body></html>"#).await;

    let service = service(MemoryStateStore::new());
    let id = service.start_crawl(&base, options()).unwrap();
    let state = service.run_to_completion(&id).await.unwrap();

    assert!(state.is_complete);
    assert_eq!(
        urls(&state.results()),
        vec![format!("{}/", base), format!("{}/a/", base)]
    );
    assert_eq!(state.urls_count.processed, 2);
    assert_eq!(state.urls_count.pending, 0);

    let document = service
        .generate_sitemap(SitemapSource::Crawl {
            id,
            options: SitemapOptions::default(),
        })
        .unwrap();
    assert_eq!(document.xml.matches(&format!("<loc>{}/</loc>", base)).count(), 1);
    assert_eq!(document.xml.matches(&format!("<loc>{}/a/</loc>", base)).count(), 1);
    assert!(document.xml.contains("<priority>1.0</priority>"));
    assert!(document.xml.contains("<priority>0.8</priority>"));
}

#[tokio::test]
async fn test_crawl_respects_robots_txt() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        r#"<a href="/private/page">Secret</a><a href="/public">Public</a>"#,
    )
    .await;
    mount_page(&server, "/public/", "<p>public</p>").await;
    Mock::given(method("GET"))
        .and(path("/private/page/"))
        .respond_with(html("<p>secret</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let service = service(MemoryStateStore::new());
    let id = service.start_crawl(&base, options()).unwrap();
    let state = service.run_to_completion(&id).await.unwrap();

    assert_eq!(
        urls(&state.results()),
        vec![format!("{}/", base), format!("{}/public/", base)]
    );
}

#[tokio::test]
async fn test_crawl_stops_at_max_depth() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/one">1</a>"#).await;
    mount_page(&server, "/one/", r#"<a href="/two">2</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/two/"))
        .respond_with(html("<p>too deep</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let service = service(MemoryStateStore::new());
    let crawl_options = CrawlOptions {
        max_depth: 1,
        ..options()
    };
    let id = service.start_crawl(&base, crawl_options).unwrap();
    let state = service.run_to_completion(&id).await.unwrap();

    assert_eq!(state.urls_count.total, 2);
    assert!(!state.discovered.contains(&format!("{}/two/", base)));
}

#[tokio::test]
async fn test_noindex_page_is_crawled_but_not_listed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/hidden">Hidden</a>"#).await;
    mount_page(
        &server,
        "/hidden/",
        r#"<html><head><meta name="robots" content="noindex"></head>
        <body><a href="/deep">Deep</a></body></html>"#,
    )
    .await;
    mount_page(&server, "/deep/", "<p>deep</p>").await;

    let service = service(MemoryStateStore::new());
    let id = service.start_crawl(&base, options()).unwrap();
    let state = service.run_to_completion(&id).await.unwrap();

    let results = state.results();
    assert_eq!(results.len(), 3);
    assert!(results
        .iter()
        .any(|r| r.url == format!("{}/hidden/", base) && r.noindex));

    let document = service
        .generate_sitemap(SitemapSource::Crawl {
            id,
            options: SitemapOptions::default(),
        })
        .unwrap();
    assert!(!document.xml.contains("/hidden/"));
    assert!(document.xml.contains(&format!("<loc>{}/deep/</loc>", base)));
}

#[tokio::test]
async fn test_cancel_preserves_pending_urls() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/a">A</a><a href="/b">B</a>"#).await;

    let service = service(MemoryStateStore::new());
    let crawl_options = CrawlOptions {
        batch_size: 1,
        concurrent_batches: 1,
        ..options()
    };
    let id = service.start_crawl(&base, crawl_options).unwrap();

    let outcome = service.run_round(&id).await.unwrap();
    assert_eq!(
        outcome,
        RoundOutcome::Continue {
            processed: 1,
            discovered: 2
        }
    );

    service.cancel(&id).unwrap();
    assert_eq!(service.run_round(&id).await.unwrap(), RoundOutcome::Cancelled);

    match service.status(&id).unwrap() {
        CrawlStatus::Cancelled(progress) => {
            assert_eq!(progress.urls_scanned, 1);
            assert_eq!(progress.total_urls, 3);
        }
        other => panic!("unexpected status {:?}", other),
    }

    let state = service.coordinator().load(&id).unwrap();
    let pending: Vec<String> = state.pending_urls.iter().map(|e| e.url.clone()).collect();
    assert_eq!(pending, vec![format!("{}/a/", base), format!("{}/b/", base)]);
}

#[tokio::test]
async fn test_crawl_stops_at_page_cap() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/p1">1</a><a href="/p2">2</a><a href="/p3">3</a><a href="/p4">4</a>"#,
    )
    .await;
    for page in ["/p1/", "/p2/", "/p3/", "/p4/"] {
        mount_page(&server, page, "<p>leaf</p>").await;
    }

    let service = service(MemoryStateStore::new());
    let crawl_options = CrawlOptions {
        max_pages: 2,
        ..options()
    };
    let id = service.start_crawl(&base, crawl_options).unwrap();
    let state = service.run_to_completion(&id).await.unwrap();

    assert!(state.is_complete);
    assert_eq!(state.urls_count.processed, 2);
    assert_eq!(state.urls_count.total, 5);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/flaky">Flaky</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/flaky/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky/"))
        .respond_with(html("<p>recovered</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let service = service(MemoryStateStore::new());
    let id = service.start_crawl(&base, options()).unwrap();
    let state = service.run_to_completion(&id).await.unwrap();

    let flaky = &state.processed_urls[&format!("{}/flaky/", base)];
    assert!(flaky.last_modified.is_some());
    assert_eq!(flaky.priority, 0.8);
}

#[tokio::test]
async fn test_persistent_failure_yields_minimal_record() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/broken">Broken</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/broken/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let service = service(MemoryStateStore::new());
    let id = service.start_crawl(&base, options()).unwrap();
    let state = service.run_to_completion(&id).await.unwrap();

    assert_eq!(state.urls_count.processed, 2);
    let broken = &state.processed_urls[&format!("{}/broken/", base)];
    assert!(broken.last_modified.is_none());
    assert_eq!(broken.priority, 0.7);
}

#[tokio::test]
async fn test_crawl_resumes_from_sqlite() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/a">A</a><a href="/b">B</a>"#).await;
    mount_page(&server, "/a/", "<p>a</p>").await;
    mount_page(&server, "/b/", "<p>b</p>").await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("state.db");
    let crawl_options = CrawlOptions {
        batch_size: 1,
        concurrent_batches: 1,
        ..options()
    };

    let id = {
        let first = service(SqliteStateStore::new(&db_path).unwrap());
        let id = first.start_crawl(&base, crawl_options.clone()).unwrap();
        first.run_round(&id).await.unwrap();
        id
    };

    let second = service(SqliteStateStore::new(&db_path).unwrap());
    assert!(second.check_options(&id, &crawl_options).unwrap());

    let state = second.run_to_completion(&id).await.unwrap();
    assert!(state.is_complete);
    assert_eq!(state.urls_count.processed, 3);

    match second.status(&id).unwrap() {
        CrawlStatus::Complete(result) => assert_eq!(result.urls.len(), 3),
        other => panic!("unexpected status {:?}", other),
    }
}
