//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the favicon engine:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the engine depends on. It
//! establishes the logging conventions, the fail-fast configuration builder,
//! and the broadcast channel over which "favicon available" notifications and
//! cache persistence events are published.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
