//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the music client core:
//! - Logging and tracing bootstrap
//! - Client configuration with fail-fast validation
//! - Event bus for session and cache notifications
//!
//! Every other crate in the workspace depends on this one for its
//! configuration and event types.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, Result};
pub use events::{AuthEvent, CacheEvent, CoreEvent, EventBus, SignOutReason};
