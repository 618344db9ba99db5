//! # Favicon Engine Configuration
//!
//! Provides configuration management for the favicon engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `FaviconConfig` instance that holds the bridges and tuning knobs the engine
//! needs. It enforces fail-fast validation so a missing bridge or an out of
//! range value is reported at startup rather than on the first lookup.
//!
//! ## Required Settings
//!
//! - `cache_dir` - Where the two lookup caches (and, on desktop, the icon
//!   blob store) live
//!
//! ## Bridges (with platform defaults)
//!
//! - `HttpClient` - Icon downloads (desktop default: reqwest)
//! - `BlobStore` - Raw icon bytes keyed by icon URL (desktop default: one file
//!   per key under `<cache_dir>/Favicons`)
//! - `FaviconFinder` - Home page link discovery (desktop default: HTML scan)
//!
//! Without the `desktop-shims` feature every bridge must be injected.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::FaviconConfig;
//! use std::time::Duration;
//!
//! let config = FaviconConfig::builder()
//!     .cache_dir("/path/to/cache")
//!     .save_delay(Duration::from_millis(500))
//!     .icon_dimension(64)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{BlobStore, FaviconFinder, HttpClient};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default trailing debounce window for lookup cache saves
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_secs(1);

/// Default edge length, in pixels, of icons returned for display
pub const DEFAULT_ICON_DIMENSION: u32 = 32;

/// Hosts whose feeds are represented by the application icon
pub const DEFAULT_APP_ICON_HOSTS: &[&str] = &["nnw.ranchero.com", "netnewswire.blog"];

/// Application icon bundled with the engine (64×64 PNG)
pub const DEFAULT_APP_ICON: &[u8] = include_bytes!("../assets/app-icon.png");

/// Name of the blob store directory inside `cache_dir`
pub const BLOB_STORE_DIR: &str = "Favicons";

const MAX_SAVE_DELAY: Duration = Duration::from_secs(60);
const MAX_ICON_DIMENSION: u32 = 1024;

/// Favicon engine configuration.
///
/// Use [`FaviconConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct FaviconConfig {
    /// Directory holding the persisted lookup caches
    pub cache_dir: PathBuf,

    /// HTTP client for icon downloads
    pub http_client: Arc<dyn HttpClient>,

    /// Store for raw icon bytes, keyed by icon URL
    pub blob_store: Arc<dyn BlobStore>,

    /// Home page link discovery
    pub favicon_finder: Arc<dyn FaviconFinder>,

    /// Delay between the first unsaved change and the write to disk
    pub save_delay: Duration,

    /// Target edge length for display icons
    pub icon_dimension: u32,

    /// Encoded application icon, served for [`app_icon_hosts`](Self::app_icon_hosts)
    pub app_icon: Option<Bytes>,

    /// Hosts that always resolve to the application icon
    pub app_icon_hosts: Vec<String>,

    /// Capacity of the event bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for FaviconConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaviconConfig")
            .field("cache_dir", &self.cache_dir)
            .field("http_client", &"HttpClient { ... }")
            .field("blob_store", &"BlobStore { ... }")
            .field("favicon_finder", &"FaviconFinder { ... }")
            .field("save_delay", &self.save_delay)
            .field("icon_dimension", &self.icon_dimension)
            .field("app_icon", &self.app_icon.as_ref().map(|b| b.len()))
            .field("app_icon_hosts", &self.app_icon_hosts)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl FaviconConfig {
    /// Creates a new builder for constructing a `FaviconConfig`.
    pub fn builder() -> FaviconConfigBuilder {
        FaviconConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Cache directory is not empty
    /// - Save delay is between 1ms and 60s
    /// - Icon dimension is between 1 and 1024 pixels
    /// - Event buffer can hold at least one event
    pub fn validate(&self) -> Result<()> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::Config("Cache directory cannot be empty".to_string()));
        }

        if self.save_delay < Duration::from_millis(1) {
            return Err(Error::Config(
                "Save delay must be at least 1ms".to_string(),
            ));
        }

        if self.save_delay > MAX_SAVE_DELAY {
            return Err(Error::Config(
                "Save delay exceeds maximum of 60 seconds".to_string(),
            ));
        }

        if self.icon_dimension == 0 || self.icon_dimension > MAX_ICON_DIMENSION {
            return Err(Error::Config(format!(
                "Icon dimension must be between 1 and {} pixels, got {}",
                MAX_ICON_DIMENSION, self.icon_dimension
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns true when `host` is served by the application icon
    pub fn is_app_icon_host(&self, host: &str) -> bool {
        self.app_icon_hosts
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(host))
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Desktop: enable the 'desktop-shims' feature to use the default implementation. \
             Other hosts: inject a platform implementation through the builder.",
            capability, purpose
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing("HttpClient", "downloading icons"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_blob_store(cache_dir: &Path) -> Result<Arc<dyn BlobStore>> {
    use bridge_desktop::FileBlobStore;

    let store = FileBlobStore::new(cache_dir.join(BLOB_STORE_DIR)).map_err(|e| {
        Error::Internal(format!("Failed to initialize default BlobStore: {}", e))
    })?;
    let store: Arc<dyn BlobStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_blob_store(_cache_dir: &Path) -> Result<Arc<dyn BlobStore>> {
    Err(capability_missing("BlobStore", "storing downloaded icon bytes"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_favicon_finder(
    http_client: Arc<dyn HttpClient>,
) -> Result<Arc<dyn FaviconFinder>> {
    use bridge_desktop::HtmlFaviconFinder;

    let finder = HtmlFaviconFinder::new(http_client).map_err(|e| {
        Error::Internal(format!("Failed to initialize default FaviconFinder: {}", e))
    })?;
    let finder: Arc<dyn FaviconFinder> = Arc::new(finder);
    Ok(finder)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_favicon_finder(
    _http_client: Arc<dyn HttpClient>,
) -> Result<Arc<dyn FaviconFinder>> {
    Err(capability_missing("FaviconFinder", "home page link discovery"))
}

/// Builder for constructing [`FaviconConfig`] instances.
#[derive(Default)]
pub struct FaviconConfigBuilder {
    cache_dir: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    blob_store: Option<Arc<dyn BlobStore>>,
    favicon_finder: Option<Arc<dyn FaviconFinder>>,
    save_delay: Option<Duration>,
    icon_dimension: Option<u32>,
    app_icon: Option<Bytes>,
    app_icon_hosts: Option<Vec<String>>,
    event_buffer_size: Option<usize>,
}

impl FaviconConfigBuilder {
    /// Sets the cache directory (required).
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::FaviconConfig;
    ///
    /// let builder = FaviconConfig::builder()
    ///     .cache_dir("/path/to/cache");
    /// ```
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the reqwest-based client is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the blob store implementation.
    ///
    /// If not provided, a file-backed store under `<cache_dir>/Favicons` is
    /// used when the `desktop-shims` feature is enabled.
    pub fn blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(store);
        self
    }

    /// Sets the home page link discovery implementation.
    pub fn favicon_finder(mut self, finder: Arc<dyn FaviconFinder>) -> Self {
        self.favicon_finder = Some(finder);
        self
    }

    /// Sets the trailing debounce window for cache saves.
    ///
    /// Default: 1 second
    pub fn save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = Some(delay);
        self
    }

    /// Sets the edge length of display icons.
    ///
    /// Default: 32 pixels
    pub fn icon_dimension(mut self, dimension: u32) -> Self {
        self.icon_dimension = Some(dimension);
        self
    }

    /// Sets the encoded application icon.
    ///
    /// Default: [`DEFAULT_APP_ICON`]
    pub fn app_icon(mut self, icon: impl Into<Bytes>) -> Self {
        self.app_icon = Some(icon.into());
        self
    }

    /// Replaces the hosts that resolve to the application icon.
    pub fn app_icon_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.app_icon_hosts = Some(hosts.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the event bus capacity.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `FaviconConfig` instance.
    ///
    /// Returns an error if the cache directory is missing, a bridge is
    /// missing and no platform default exists, or a value is out of range.
    pub fn build(self) -> Result<FaviconConfig> {
        let cache_dir = self.cache_dir.ok_or_else(|| {
            Error::Config("Cache directory is required. Use .cache_dir() to set it.".to_string())
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let blob_store = match self.blob_store {
            Some(store) => store,
            None => provide_default_blob_store(&cache_dir)?,
        };

        let favicon_finder = match self.favicon_finder {
            Some(finder) => finder,
            None => provide_default_favicon_finder(http_client.clone())?,
        };

        let config = FaviconConfig {
            cache_dir,
            http_client,
            blob_store,
            favicon_finder,
            save_delay: self.save_delay.unwrap_or(DEFAULT_SAVE_DELAY),
            icon_dimension: self.icon_dimension.unwrap_or(DEFAULT_ICON_DIMENSION),
            app_icon: Some(
                self.app_icon.unwrap_or_else(|| Bytes::from_static(DEFAULT_APP_ICON)),
            ),
            app_icon_hosts: self.app_icon_hosts.unwrap_or_else(|| {
                DEFAULT_APP_ICON_HOSTS
                    .iter()
                    .map(|host| host.to_string())
                    .collect()
            }),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
