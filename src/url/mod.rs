//! URL handling module for Sitemap-Ripple
//!
//! This module provides URL normalization and the rules deciding which
//! discovered URLs may enter a crawl's frontier.

mod normalize;
mod policy;

// Re-export main functions
pub use normalize::normalize_url;
pub use policy::InclusionPolicy;
