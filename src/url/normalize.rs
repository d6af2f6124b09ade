use url::Url;

/// Normalizes a URL so that equivalent page addresses compare equal
///
/// # Normalization Steps
///
/// 1. Trim whitespace and drop stray text glued before the scheme
///    (`lockhttps://example.com` becomes `https://example.com`)
/// 2. Prepend `https://` when no scheme is present
/// 3. Parse the URL; non-HTTP schemes are returned unchanged
/// 4. Lowercase the host
/// 5. Remove the query string and the fragment
/// 6. Add a trailing slash unless the path ends in a file extension
///    of 2-4 alphanumeric characters
///
/// Normalization never fails. Input that can not be parsed is logged and
/// returned unchanged, so callers can always use the result as a key.
/// Applying the function to its own output is a no-op.
///
/// # Arguments
///
/// * `raw` - The URL string to normalize
///
/// # Returns
///
/// The canonical form of the URL, or `raw` if it could not be normalized
///
/// # Examples
///
/// ```
/// use sitemap_ripple::url::normalize_url;
///
/// assert_eq!(normalize_url("https://Example.com/a?x=1#top"), "https://example.com/a/");
/// assert_eq!(normalize_url("example.com/logo.png"), "https://example.com/logo.png");
/// ```
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return raw.to_string();
    }

    let candidate = strip_glued_prefix(trimmed);

    if has_opaque_scheme(candidate) {
        return raw.to_string();
    }

    let with_scheme = if candidate.contains("://") {
        candidate.to_string()
    } else {
        format!("https://{}", candidate.trim_start_matches('/'))
    };

    let mut url = match Url::parse(&with_scheme) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Could not normalize URL {:?}: {}", raw, e);
            return raw.to_string();
        }
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return raw.to_string();
    }

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_lowercase(),
        _ => {
            tracing::warn!("Could not normalize URL {:?}: missing host", raw);
            return raw.to_string();
        }
    };
    if url.set_host(Some(&host)).is_err() {
        tracing::warn!("Could not normalize URL {:?}: invalid host", raw);
        return raw.to_string();
    }

    url.set_query(None);
    url.set_fragment(None);

    let path = url.path().to_string();
    if !path.ends_with('/') && !has_file_extension(&path) {
        url.set_path(&format!("{}/", path));
    }

    url.to_string()
}

/// Strips alphanumeric junk glued directly before an `http(s)://` scheme
fn strip_glued_prefix(s: &str) -> &str {
    let lower = s.to_ascii_lowercase();
    let start = lower
        .match_indices("http")
        .map(|(idx, _)| idx)
        .find(|&idx| lower[idx..].starts_with("http://") || lower[idx..].starts_with("https://"));

    match start {
        Some(idx) if idx > 0 && s[..idx].chars().all(|c| c.is_ascii_alphanumeric()) => &s[idx..],
        _ => s,
    }
}

/// Returns true for schemes that never name a crawlable page
fn has_opaque_scheme(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    ["mailto:", "tel:", "javascript:", "data:", "ftp:", "file:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

/// Returns true if the path ends in `.xx` to `.xxxx` (alphanumeric)
fn has_file_extension(path: &str) -> bool {
    match path.rsplit_once('.') {
        Some((_, ext)) => (2..=4).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}
