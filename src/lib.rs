//! Workspace umbrella crate.
//!
//! Hosts can depend on `musicpod-workspace` alone and get the façade from
//! `core-service`, with the desktop bridges behind the default
//! `desktop-shims` feature.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
