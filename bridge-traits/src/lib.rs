//! # Host Bridge Traits
//!
//! Seams between the music client core and the host platform.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - One-shot HTTP round trips to the
//!   accounts and catalog services
//! - [`SecureStore`](storage::SecureStore) - Persisted credentials (access and
//!   refresh token)
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//! | Mobile   | injected by the host app |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should map transport failures to `Timeout`/`Connection` so callers can tell
//! "no response" apart from an HTTP error status, which is never an `Err`.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single instance can be shared
//! across the async tasks of every coordinator.

pub mod error;
pub mod http;
pub mod storage;

pub use error::{BridgeError, Result};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::SecureStore;
