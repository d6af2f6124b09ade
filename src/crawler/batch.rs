//! Batch processing - the worker side of a crawl round
//!
//! A batch worker fetches a bounded set of frontier entries concurrently and
//! reports one page record per entry plus the links worth following. It holds
//! no crawl state; everything it needs arrives with the call.

use crate::crawler::fetcher::{build_http_client, fetch_page, RetryPolicy};
use crate::crawler::parser::parse_page;
use crate::robots::{fetch_robots, origin_key, CachedRobots, ParsedRobots};
use crate::state::{CrawlOptions, FrontierEntry, PageRecord};
use crate::url::{normalize_url, InclusionPolicy};
use crate::Result;
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// User agent sent by the crawler unless configured otherwise
pub const DEFAULT_USER_AGENT: &str = "SitemapGenerator/1.0";

/// Result of one batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutput {
    /// One record per processed entry
    pub processed_urls: Vec<PageRecord>,

    /// Links worth following, one entry per normalized URL at its shallowest depth
    pub new_urls: Vec<FrontierEntry>,
}

/// Fetches and extracts a batch of frontier entries
pub trait BatchWorker: Send + Sync {
    /// Processes `entries` for the crawl rooted at `base_url`
    ///
    /// A failure of a single URL yields a minimal record and never fails the
    /// batch; an `Err` means the whole batch could not be processed and its
    /// URLs should be retried.
    fn process_batch(
        &self,
        entries: Vec<FrontierEntry>,
        base_url: &Url,
        options: &CrawlOptions,
    ) -> impl Future<Output = Result<BatchOutput>> + Send;
}

/// Priority for a page found `depth` hops from the seed
///
/// 1.0 for the seed, 0.8 and 0.6 for the next two levels, then 0.2 less per
/// level with a floor of 0.1.
pub fn priority_for_depth(depth: u32) -> f32 {
    let raw = match depth {
        0 => 1.0,
        1 => 0.8,
        2 => 0.6,
        d => (0.6 - f64::from(d - 2) * 0.2).max(0.1),
    };
    ((raw * 10.0_f64).round() / 10.0) as f32
}

/// Batch worker that fetches pages over HTTP
pub struct HttpBatchWorker {
    client: Client,
    user_agent: String,
    robots_cache: Mutex<HashMap<String, CachedRobots>>,
}

impl HttpBatchWorker {
    /// Creates a worker sending `user_agent` with every request
    ///
    /// # Arguments
    ///
    /// * `user_agent` - The User-Agent header value
    /// * `timeout` - Client-wide ceiling; each request also carries the crawl's own timeout
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(user_agent, timeout)?,
            user_agent: user_agent.to_string(),
            robots_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the robots.txt rules for the origin of `base_url`, fetching
    /// them at most once per 24 hours
    ///
    /// The cache lock is held across the fetch, so concurrent batches of a
    /// crawl wait for the first fetch instead of issuing their own.
    async fn robots_for(&self, base_url: &Url, timeout: Duration) -> ParsedRobots {
        let key = origin_key(base_url);
        let mut cache = self.robots_cache.lock().await;

        if let Some(cached) = cache.get(&key) {
            if !cached.is_stale() {
                return cached.content.clone();
            }
        }

        let robots = fetch_robots(&self.client, base_url, timeout).await;
        cache.insert(key, CachedRobots::new(robots.clone()));
        robots
    }

    /// Fetches and extracts one entry; never fails
    async fn process_entry(
        &self,
        entry: &FrontierEntry,
        policy: &InclusionPolicy,
        options: &CrawlOptions,
    ) -> (PageRecord, Vec<FrontierEntry>) {
        let stub = || PageRecord::stub(entry.url.clone(), options.change_frequency, options.priority);

        let url = match Url::parse(&entry.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping unparseable URL {}: {}", entry.url, e);
                return (stub(), Vec::new());
            }
        };

        let retry = RetryPolicy::new(options.retry_count, options.retry_backoff);
        let page = match fetch_page(&self.client, &url, options.request_timeout(), retry).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                return (stub(), Vec::new());
            }
        };

        if !page.is_html() {
            tracing::debug!("{} is not HTML ({})", url, page.content_type);
            return (stub(), Vec::new());
        }

        let parsed = parse_page(
            &page.body,
            &page.final_url,
            options.include_images,
            page.last_modified_header.as_deref(),
        );

        let record = PageRecord {
            url: entry.url.clone(),
            last_modified: Some(parsed.last_modified),
            change_frequency: options.change_frequency,
            priority: priority_for_depth(entry.depth),
            images: if parsed.images.is_empty() {
                None
            } else {
                Some(parsed.images)
            },
            noindex: options.exclude_noindex && parsed.noindex,
        };

        if record.noindex {
            tracing::debug!("{} is marked noindex", url);
        }

        let mut links = Vec::new();
        if entry.depth < options.max_depth {
            for link in &parsed.links {
                if policy.include(link, &page.final_url) {
                    links.push(FrontierEntry::new(normalize_url(link.as_str()), entry.depth + 1));
                }
            }
        }

        tracing::debug!("Processed {} ({} links)", url, links.len());
        (record, links)
    }
}

impl BatchWorker for HttpBatchWorker {
    async fn process_batch(
        &self,
        entries: Vec<FrontierEntry>,
        base_url: &Url,
        options: &CrawlOptions,
    ) -> Result<BatchOutput> {
        let robots = if options.respect_robots_txt {
            Some(self.robots_for(base_url, options.robots_timeout()).await)
        } else {
            None
        };
        let policy = InclusionPolicy::new(base_url.clone(), robots, self.user_agent.clone());

        let results = join_all(
            entries
                .iter()
                .map(|entry| self.process_entry(entry, &policy, options)),
        )
        .await;

        let mut output = BatchOutput::default();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (record, links) in results {
            output.processed_urls.push(record);

            for link in links {
                match positions.get(&link.url) {
                    Some(&index) => {
                        let existing = &mut output.new_urls[index];
                        existing.depth = existing.depth.min(link.depth);
                    }
                    None => {
                        positions.insert(link.url.clone(), output.new_urls.len());
                        output.new_urls.push(link);
                    }
                }
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_string(body.to_string())
            .insert_header("content-type", "text/html")
    }

    fn worker() -> HttpBatchWorker {
        HttpBatchWorker::new(DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_priority_for_depth() {
        assert_eq!(priority_for_depth(0), 1.0);
        assert_eq!(priority_for_depth(1), 0.8);
        assert_eq!(priority_for_depth(2), 0.6);
        assert_eq!(priority_for_depth(3), 0.4);
        assert_eq!(priority_for_depth(4), 0.2);
        assert_eq!(priority_for_depth(5), 0.1);
        assert_eq!(priority_for_depth(30), 0.1);
    }

    #[test]
    fn test_batch_output_wire_names() {
        let output: BatchOutput = serde_json::from_str(
            r#"{"processedUrls":[{"url":"https://example.com/"}],"newUrls":["https://example.com/a/"]}"#,
        )
        .unwrap();
        assert_eq!(output.processed_urls.len(), 1);
        assert_eq!(output.new_urls[0].depth, 0);
    }

    #[tokio::test]
    async fn test_process_batch_extracts_and_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(
                r#"<html><head><meta name="last-modified" content="2024-01-01T00:00:00Z"></head>
                <body>
                    <a href="/a">A</a>
                    <a href="/a?ref=nav#top">A again</a>
                    <a href="/logo.png">image link</a>
                    <a href="/wp-admin/">admin</a>
                    <a href="https://other.example/x">offsite</a>
                    <img src="/hero.jpg">
                </body></html>"#,
            ))
            .mount(&server)
            .await;

        let base = Url::parse(&format!("{}/", server.uri())).unwrap();
        let options = CrawlOptions {
            respect_robots_txt: false,
            ..Default::default()
        };

        let output = worker()
            .process_batch(vec![FrontierEntry::new(base.as_str(), 0)], &base, &options)
            .await
            .unwrap();

        assert_eq!(output.processed_urls.len(), 1);
        let record = &output.processed_urls[0];
        assert_eq!(record.priority, 1.0);
        assert_eq!(
            record.images,
            Some(vec![format!("{}/hero.jpg", server.uri())])
        );
        assert_eq!(
            record.last_modified.map(|d| d.to_rfc3339()),
            Some("2024-01-01T00:00:00+00:00".to_string())
        );

        assert_eq!(
            output.new_urls,
            vec![FrontierEntry::new(format!("{}/a/", server.uri()), 1)]
        );
    }

    #[tokio::test]
    async fn test_no_links_at_max_depth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/deep/"))
            .respond_with(html(r#"<a href="/deeper">x</a>"#))
            .mount(&server)
            .await;

        let base = Url::parse(&format!("{}/", server.uri())).unwrap();
        let options = CrawlOptions {
            max_depth: 1,
            respect_robots_txt: false,
            ..Default::default()
        };

        let output = worker()
            .process_batch(
                vec![FrontierEntry::new(format!("{}/deep/", server.uri()), 1)],
                &base,
                &options,
            )
            .await
            .unwrap();

        assert_eq!(output.processed_urls.len(), 1);
        assert!(output.new_urls.is_empty());
    }

    #[tokio::test]
    async fn test_failures_yield_minimal_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/file.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .insert_header("content-type", "application/json"),
            )
            .mount(&server)
            .await;

        let base = Url::parse(&format!("{}/", server.uri())).unwrap();
        let options = CrawlOptions {
            respect_robots_txt: false,
            retry_count: 0,
            ..Default::default()
        };

        let output = worker()
            .process_batch(
                vec![
                    FrontierEntry::new(format!("{}/gone/", server.uri()), 1),
                    FrontierEntry::new(format!("{}/file.json", server.uri()), 1),
                ],
                &base,
                &options,
            )
            .await
            .unwrap();

        assert_eq!(output.processed_urls.len(), 2);
        for record in &output.processed_urls {
            assert!(record.last_modified.is_none());
            assert_eq!(record.priority, options.priority);
        }
    }

    #[tokio::test]
    async fn test_noindex_page_flagged_but_links_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(
                r#"<head><meta name="robots" content="noindex"></head><body><a href="/b">b</a></body>"#,
            ))
            .mount(&server)
            .await;

        let base = Url::parse(&format!("{}/", server.uri())).unwrap();
        let options = CrawlOptions {
            respect_robots_txt: false,
            ..Default::default()
        };

        let output = worker()
            .process_batch(vec![FrontierEntry::new(base.as_str(), 0)], &base, &options)
            .await
            .unwrap();

        assert!(output.processed_urls[0].noindex);
        assert_eq!(output.new_urls.len(), 1);
    }

    #[tokio::test]
    async fn test_robots_filters_new_urls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(r#"<a href="/private/x">p</a><a href="/public">q</a>"#))
            .mount(&server)
            .await;

        let base = Url::parse(&format!("{}/", server.uri())).unwrap();
        let options = CrawlOptions::default();
        let worker = worker();

        let output = worker
            .process_batch(vec![FrontierEntry::new(base.as_str(), 0)], &base, &options)
            .await
            .unwrap();
        assert_eq!(
            output.new_urls,
            vec![FrontierEntry::new(format!("{}/public/", server.uri()), 1)]
        );

        // second batch reuses the cached robots.txt
        worker
            .process_batch(vec![FrontierEntry::new(base.as_str(), 0)], &base, &options)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_batches_fetch_robots_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nAllow: /")
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;
        for page in ["/a/", "/b/", "/c/"] {
            Mock::given(method("GET"))
                .and(path(page))
                .respond_with(html("<p>leaf</p>"))
                .mount(&server)
                .await;
        }

        let base = Url::parse(&format!("{}/", server.uri())).unwrap();
        let options = CrawlOptions::default();
        let worker = worker();

        let batches: Vec<Vec<FrontierEntry>> = ["/a/", "/b/", "/c/"]
            .iter()
            .map(|page| vec![FrontierEntry::new(format!("{}{}", server.uri(), page), 1)])
            .collect();
        let results = join_all(
            batches
                .into_iter()
                .map(|batch| worker.process_batch(batch, &base, &options)),
        )
        .await;

        for result in results {
            assert_eq!(result.unwrap().processed_urls.len(), 1);
        }
    }
}
