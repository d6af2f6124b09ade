/// Page record definitions for the sitemap output
///
/// A `PageRecord` is produced once per processed URL and is the unit the
/// sitemap generator serializes.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How frequently a page is likely to change (sitemap `<changefreq>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    #[default]
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    /// Returns the sitemap protocol spelling of this frequency
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for ChangeFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "never" => Ok(Self::Never),
            other => Err(format!("unknown change frequency '{}'", other)),
        }
    }
}

fn default_priority() -> f32 {
    0.7
}

/// One processed page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// The page URL (normalized once it has passed through the coordinator)
    pub url: String,

    /// Last modification time, when known
    #[serde(rename = "lastmod", default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,

    /// Expected change frequency
    #[serde(rename = "changefreq", default)]
    pub change_frequency: ChangeFrequency,

    /// Priority in [0.0, 1.0]
    #[serde(default = "default_priority")]
    pub priority: f32,

    /// Absolute image URLs found on the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,

    /// The page asked not to be indexed; it counts as processed but is left
    /// out of the sitemap
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub noindex: bool,
}

impl PageRecord {
    /// Creates a record with the given change frequency and priority and no
    /// metadata
    pub fn stub(url: impl Into<String>, change_frequency: ChangeFrequency, priority: f32) -> Self {
        Self {
            url: url.into(),
            last_modified: None,
            change_frequency,
            priority,
            images: None,
            noindex: false,
        }
    }

    /// Returns true if `other` should replace this record's metadata
    ///
    /// A record with a timestamp beats one without; between two timestamps
    /// the later one wins. Ties keep the existing record.
    pub fn is_superseded_by(&self, other: &PageRecord) -> bool {
        match (self.last_modified, other.last_modified) {
            (Some(current), Some(candidate)) => candidate > current,
            (None, Some(_)) => true,
            _ => false,
        }
    }

    /// Merges a record for the same URL into this one
    ///
    /// The more recent record's metadata wins, but image lists are always
    /// unioned so neither side's images are lost. The URL of `self` is kept.
    pub fn merge(&mut self, other: PageRecord) {
        let mut images: Vec<String> = self.images.take().unwrap_or_default();
        for image in other.images.iter().flatten() {
            if !images.contains(image) {
                images.push(image.clone());
            }
        }

        if self.is_superseded_by(&other) {
            let url = std::mem::take(&mut self.url);
            *self = other;
            self.url = url;
        }

        self.images = if images.is_empty() { None } else { Some(images) };
    }
}
