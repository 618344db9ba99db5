//! # Favicon Engine
//!
//! Resolves, downloads and caches the icons shown next to feeds.
//!
//! ## Overview
//!
//! This crate handles:
//! - Per-icon-URL download de-duplication (`SingleFaviconDownloader`)
//! - Home page discovery with ordered candidate fallback (`FaviconDownloader`)
//! - Persisted home page → icon URL and "no icon" lookup caches
//! - Display-sized icons memoized per feed
//!
//! Nothing here returns an error to the UI: an icon is either known now, or
//! announced later through [`core_runtime::events::FaviconEvent::Available`].

pub mod downloader;
pub mod error;
pub mod feed;
pub mod icon;
pub mod lookup_cache;
pub mod memo;
pub mod single;

pub use downloader::{DownloaderMessage, FaviconDownloader};
pub use error::{FaviconError, Result};
pub use feed::{Feed, FeedSetting};
pub use icon::IconImage;
pub use lookup_cache::CacheKind;
pub use memo::IconMemoCache;
pub use single::{DownloadState, SingleFaviconDownloader};
