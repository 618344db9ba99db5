//! Feed records and home page URL helpers

use crate::error::{FaviconError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// The parts of a feed the engine reads
///
/// Feeds are owned by the host; the engine only uses them as cache keys and as
/// input to resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// Stable identity, used to key the decoded-icon memo cache
    pub feed_id: String,
    /// URL of the feed document itself
    pub url: String,
    /// Icon URL declared by the feed, if any
    pub favicon_url: Option<String>,
    /// Home page declared by the feed, if any
    pub home_page_url: Option<String>,
}

impl Feed {
    pub fn new(feed_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            feed_id: feed_id.into(),
            url: url.into(),
            favicon_url: None,
            home_page_url: None,
        }
    }

    pub fn with_home_page_url(mut self, home_page_url: impl Into<String>) -> Self {
        self.home_page_url = Some(home_page_url.into());
        self
    }

    pub fn with_favicon_url(mut self, favicon_url: impl Into<String>) -> Self {
        self.favicon_url = Some(favicon_url.into());
        self
    }
}

/// Feed settings the host reports as changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedSetting {
    HomePageUrl,
    FaviconUrl,
    Name,
}

impl FeedSetting {
    /// Whether a change to this setting can change the feed's icon
    pub fn affects_favicon(&self) -> bool {
        matches!(self, FeedSetting::HomePageUrl | FeedSetting::FaviconUrl)
    }
}

fn parse(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed)
        .map_err(|e| FaviconError::InvalidUrl(format!("{}: {}", trimmed, e)))?;
    if url.host_str().is_none() {
        return Err(FaviconError::InvalidUrl(format!("{}: no host", trimmed)));
    }
    Ok(url)
}

/// Canonical form of a home page URL, used as the lookup cache key
///
/// Scheme and host are lowercased and a single trailing slash is dropped, so
/// `HTTPS://Example.com/` and `https://example.com` share one entry.
pub fn normalize_home_page_url(raw: &str) -> Option<String> {
    let url = parse(raw).ok()?;
    let mut normalized = url.to_string();
    if normalized.ends_with('/') {
        normalized.pop();
    }
    Some(normalized)
}

/// Best-effort home page for a feed that does not declare one: `scheme://host/`
///
/// Wrong for feeds hosted away from their site (feed proxies, CDNs).
pub fn home_page_url_from_feed_url(feed_url: &str) -> Option<String> {
    let url = parse(feed_url).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}/", url.scheme(), host, port),
        None => format!("{}://{}/", url.scheme(), host),
    })
}

/// The conventional `/favicon.ico` location for a home page
pub fn default_favicon_url(home_page_url: &str) -> Option<String> {
    let url = parse(home_page_url).ok()?;
    let host = url.host_str()?;
    let default = match url.port() {
        Some(port) => format!("{}://{}:{}/favicon.ico", url.scheme(), host, port),
        None => format!("{}://{}/favicon.ico", url.scheme(), host),
    };
    Some(default.to_lowercase())
}

/// Lowercased host of a URL
pub fn host_of(raw: &str) -> Option<String> {
    parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_ascii_lowercase()))
}
