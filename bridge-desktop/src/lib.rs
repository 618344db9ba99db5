//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides production-ready implementations of the bridge traits
//! using desktop-appropriate libraries:
//! - `HttpClient` using `reqwest`
//! - `BlobStore` using one file per key under the platform cache directory
//! - `FaviconFinder` scanning home page markup for icon links
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FileBlobStore, HtmlFaviconFinder, ReqwestHttpClient};
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new());
//! let finder = HtmlFaviconFinder::new(http_client.clone())?;
//! let blob_store = FileBlobStore::in_default_location()?;
//! ```

mod blob_store;
mod finder;
mod http;

pub use blob_store::FileBlobStore;
pub use finder::HtmlFaviconFinder;
pub use http::ReqwestHttpClient;
