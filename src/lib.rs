//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-favicon`, `core-runtime`). Host applications can
//! depend on `favicon-workspace` and enable the documented features without
//! needing to wire each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_favicon as favicon;

#[cfg(feature = "desktop-shims")]
pub use core_runtime as runtime;
