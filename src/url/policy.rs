//! Frontier inclusion rules
//!
//! Decides whether a link found on a page may enter the frontier. Rules are
//! checked cheapest first and the first failing rule rejects the candidate.

use crate::robots::ParsedRobots;
use crate::url::normalize_url;
use url::Url;

/// File extensions that never name a crawlable HTML page
const DENIED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".css", ".js", ".pdf", ".doc", ".docx",
    ".xls", ".xlsx", ".zip", ".rar", ".tar", ".gz", ".mp3", ".mp4", ".avi", ".mov", ".wmv",
    ".webm", ".woff", ".woff2", ".ttf", ".eot", ".xml",
];

/// Path prefixes for admin, auth, search and feed areas
const DENIED_PATH_PREFIXES: &[&str] = &[
    "/wp-admin",
    "/wp-login",
    "/wp-json",
    "/admin",
    "/login",
    "/logout",
    "/cdn-cgi/",
    "/wp-content/uploads",
    "/search",
    "/tag/",
    "/author/",
    "/feed/",
    "/comments/",
    "/trackback/",
];

/// CDN endpoint that obfuscates email addresses
const EMAIL_PROTECTION_PATH: &str = "/cdn-cgi/l/email-protection";

/// Inclusion rules bound to one crawl
#[derive(Debug, Clone)]
pub struct InclusionPolicy {
    base: Url,
    base_normalized: String,
    robots: Option<ParsedRobots>,
    user_agent: String,
}

impl InclusionPolicy {
    /// Creates a policy for the crawl rooted at `base`
    ///
    /// # Arguments
    ///
    /// * `base` - The crawl's root URL; its host bounds the crawl
    /// * `robots` - Parsed robots.txt, or `None` when robots.txt is ignored
    /// * `user_agent` - The agent robots.txt groups are matched against
    pub fn new(base: Url, robots: Option<ParsedRobots>, user_agent: impl Into<String>) -> Self {
        let base_normalized = normalize_url(base.as_str());
        Self {
            base,
            base_normalized,
            robots,
            user_agent: user_agent.into(),
        }
    }

    /// Returns the crawl's root URL
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Returns true if `candidate`, found on the page `referrer`, may enter the frontier
    pub fn include(&self, candidate: &Url, referrer: &Url) -> bool {
        if !self.same_host(candidate) {
            tracing::trace!("Rejected {} (other host)", candidate);
            return false;
        }

        let path = candidate.path().to_lowercase();

        if DENIED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            tracing::trace!("Rejected {} (file extension)", candidate);
            return false;
        }

        if DENIED_PATH_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
            || candidate.as_str().contains(EMAIL_PROTECTION_PATH)
        {
            tracing::trace!("Rejected {} (denied path)", candidate);
            return false;
        }

        if let Some(robots) = &self.robots {
            if !robots.is_allowed(candidate.as_str(), &self.user_agent) {
                tracing::trace!("Rejected {} (robots.txt)", candidate);
                return false;
            }
        }

        if candidate.fragment().is_some() && self.is_pure_anchor(candidate, referrer) {
            tracing::trace!("Rejected {} (anchor on known page)", candidate);
            return false;
        }

        true
    }

    fn same_host(&self, candidate: &Url) -> bool {
        match (candidate.host_str(), self.base.host_str()) {
            (Some(candidate_host), Some(base_host)) => {
                candidate_host.eq_ignore_ascii_case(base_host)
            }
            _ => false,
        }
    }

    fn is_pure_anchor(&self, candidate: &Url, referrer: &Url) -> bool {
        let mut stripped = candidate.clone();
        stripped.set_fragment(None);
        let stripped = normalize_url(stripped.as_str());

        stripped == normalize_url(referrer.as_str()) || stripped == self.base_normalized
    }
}
