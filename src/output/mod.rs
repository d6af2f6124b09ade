//! Output module for generating sitemap documents
//!
//! This module handles:
//! - Deduplicating and merging page records
//! - Serializing them as sitemap XML
//! - Indenting the document and writing it to disk

mod pretty;
mod sitemap;

pub use pretty::prettify;
pub use sitemap::{escape_xml, generate_sitemap, SitemapOptions, NO_URLS_MESSAGE};

use crate::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a sitemap document to `path`, replacing any existing file
pub fn write_sitemap(path: &Path, xml: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(xml.as_bytes())?;
    tracing::info!("Wrote sitemap to {}", path.display());
    Ok(())
}
