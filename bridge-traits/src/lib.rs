//! # Host Bridge Traits
//!
//! Contracts for the collaborators the favicon engine needs but does not own.
//!
//! ## Overview
//!
//! This crate defines the boundary between the favicon engine and the host
//! platform. Each trait represents a capability the engine requires but that is
//! implemented differently per platform (desktop, mobile, web).
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Fetch primitive for icons and home pages
//! - [`BlobStore`](storage::BlobStore) - Key→bytes store for raw icon data
//! - [`FaviconFinder`](discovery::FaviconFinder) - Home page link discovery
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError` and
//! include context such as the URL or key involved.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! with background tasks through `Arc`.

pub mod discovery;
pub mod error;
pub mod http;
pub mod log;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use discovery::FaviconFinder;
pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use storage::{BlobStore, MemoryBlobStore};
