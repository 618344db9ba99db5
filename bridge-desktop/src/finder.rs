//! Favicon link discovery by scanning home page markup

use async_trait::async_trait;
use bridge_traits::{
    discovery::FaviconFinder,
    error::{BridgeError, Result},
    http::HttpClient,
};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Finds icon URLs declared by `<link rel="…icon…" href="…">` tags
///
/// The page is fetched through the injected [`HttpClient`]. Only the head of
/// the document matters in practice, but the whole body is scanned since some
/// sites put their links after inline scripts. SVG icons are skipped; the
/// engine's decoder only handles raster formats.
pub struct HtmlFaviconFinder {
    http_client: Arc<dyn HttpClient>,
    link_tag: Regex,
    attribute: Regex,
}

impl HtmlFaviconFinder {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Result<Self> {
        let link_tag = Regex::new(r"(?is)<link\b[^>]*>")
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid link pattern: {}", e)))?;
        let attribute =
            Regex::new(r#"(?is)\b([a-z-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).map_err(
                |e| BridgeError::OperationFailed(format!("Invalid attribute pattern: {}", e)),
            )?;

        Ok(Self {
            http_client,
            link_tag,
            attribute,
        })
    }

    /// Extract icon URLs from `html`, resolved against `base`, in document order
    pub fn extract_favicon_urls(&self, html: &str, base: &Url) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();

        for tag in self.link_tag.find_iter(html) {
            let mut rel = None;
            let mut href = None;
            let mut mime_type = None;

            for caps in self.attribute.captures_iter(tag.as_str()) {
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .or_else(|| caps.get(4))
                    .map(|m| m.as_str().trim().to_string());
                match caps[1].to_ascii_lowercase().as_str() {
                    "rel" => rel = value,
                    "href" => href = value,
                    "type" => mime_type = value,
                    _ => {}
                }
            }

            let (Some(rel), Some(href)) = (rel, href) else {
                continue;
            };
            if !is_icon_rel(&rel) || href.is_empty() {
                continue;
            }
            if is_svg(&href, mime_type.as_deref()) {
                debug!(href = %href, "Skipping SVG icon");
                continue;
            }

            match base.join(&href) {
                Ok(resolved) => {
                    let resolved = resolved.to_string();
                    if !urls.contains(&resolved) {
                        urls.push(resolved);
                    }
                }
                Err(e) => debug!(href = %href, error = %e, "Ignoring unresolvable icon href"),
            }
        }

        urls
    }
}

fn is_icon_rel(rel: &str) -> bool {
    rel.split_ascii_whitespace().any(|token| {
        let token = token.to_ascii_lowercase();
        token == "icon" || token.starts_with("apple-touch-icon")
    })
}

fn is_svg(href: &str, mime_type: Option<&str>) -> bool {
    if mime_type.is_some_and(|t| t.eq_ignore_ascii_case("image/svg+xml")) {
        return true;
    }
    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.to_ascii_lowercase().ends_with(".svg")
}

#[async_trait]
impl FaviconFinder for HtmlFaviconFinder {
    async fn find_favicon_urls(&self, home_page_url: &str) -> Option<Vec<String>> {
        let base = match Url::parse(home_page_url) {
            Ok(url) => url,
            Err(e) => {
                debug!(home_page_url = %home_page_url, error = %e, "Home page URL does not parse");
                return None;
            }
        };

        let response = match self.http_client.fetch_bytes(home_page_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(home_page_url = %home_page_url, error = %e, "Failed to fetch home page");
                return None;
            }
        };

        let html = String::from_utf8_lossy(&response);
        let urls = self.extract_favicon_urls(&html, &base);
        debug!(
            home_page_url = %home_page_url,
            count = urls.len(),
            "Discovered declared favicons"
        );
        Some(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::http::{HttpRequest, HttpResponse};
    use bytes::Bytes;
    use std::collections::HashMap;

    struct PageClient {
        status: u16,
        body: &'static str,
    }

    #[async_trait]
    impl HttpClient for PageClient {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse> {
            Ok(HttpResponse {
                status: self.status,
                headers: HashMap::new(),
                body: Bytes::from_static(self.body.as_bytes()),
            })
        }
    }

    fn finder(status: u16, body: &'static str) -> HtmlFaviconFinder {
        HtmlFaviconFinder::new(Arc::new(PageClient { status, body })).unwrap()
    }

    #[test]
    fn test_extracts_icons_in_document_order() {
        let finder = finder(200, "");
        let base = Url::parse("https://example.com/blog/").unwrap();
        let html = r#"
            <html><head>
            <link rel="stylesheet" href="/style.css">
            <link rel="icon" type="image/png" href="/icon.png">
            <LINK REL='shortcut icon' HREF='favicon-32.ico'>
            <link href="https://cdn.example.com/touch.png" rel="apple-touch-icon-precomposed">
            <link rel="icon" href="/icon.png">
            </head></html>
        "#;

        let urls = finder.extract_favicon_urls(html, &base);
        assert_eq!(
            urls,
            vec![
                "https://example.com/icon.png".to_string(),
                "https://example.com/blog/favicon-32.ico".to_string(),
                "https://cdn.example.com/touch.png".to_string(),
            ]
        );
    }

    #[test]
    fn test_skips_svg_icons() {
        let finder = finder(200, "");
        let base = Url::parse("https://example.com/").unwrap();
        let html = r#"
            <link rel="icon" href="/icon.svg?v=2">
            <link rel="icon" type="image/svg+xml" href="/vector">
            <link rel="icon" href="/icon.png">
        "#;

        assert_eq!(
            finder.extract_favicon_urls(html, &base),
            vec!["https://example.com/icon.png".to_string()]
        );
    }

    #[test]
    fn test_rel_matching() {
        assert!(is_icon_rel("icon"));
        assert!(is_icon_rel("Shortcut Icon"));
        assert!(is_icon_rel("apple-touch-icon"));
        assert!(!is_icon_rel("stylesheet"));
        assert!(!is_icon_rel("mask-icon"));
    }

    #[tokio::test]
    async fn test_find_reports_declared_icons() {
        let finder = finder(200, r#"<link rel="icon" href="/icon.png">"#);
        assert_eq!(
            finder.find_favicon_urls("https://example.com/").await,
            Some(vec!["https://example.com/icon.png".to_string()])
        );
    }

    #[tokio::test]
    async fn test_find_returns_empty_when_nothing_declared() {
        let finder = finder(200, "<html><head><title>hi</title></head></html>");
        assert_eq!(
            finder.find_favicon_urls("https://example.com/").await,
            Some(vec![])
        );
    }

    #[tokio::test]
    async fn test_find_returns_none_on_http_error() {
        let finder = finder(500, "");
        assert_eq!(finder.find_favicon_urls("https://example.com/").await, None);
    }

    #[tokio::test]
    async fn test_find_returns_none_for_unparseable_url() {
        let finder = finder(200, "");
        assert_eq!(finder.find_favicon_urls("not a url").await, None);
    }
}
