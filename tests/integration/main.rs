//! Integration tests for Sitemap-Ripple

mod crawl_tests;
mod sitemap_tests;
