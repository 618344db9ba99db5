//! Favicon Link Discovery
//!
//! Given a home page URL, produce the icon URLs the page declares.

use async_trait::async_trait;

/// Home page link discovery trait
///
/// Implementations typically fetch the home page and read its
/// `<link rel="icon">`-style declarations. The engine appends the conventional
/// `/favicon.ico` location itself, so implementations should report only what
/// the page actually declares, in document order.
///
/// Discovery failures (network errors, unparseable markup) are reported as
/// `None`; the engine treats that the same as "nothing declared".
#[async_trait]
pub trait FaviconFinder: Send + Sync {
    /// Find candidate icon URLs for `home_page_url`
    async fn find_favicon_urls(&self, home_page_url: &str) -> Option<Vec<String>>;
}
