//! # Spotify Catalog Provider
//!
//! Remote fetcher for the Spotify Web API.
//!
//! ## Overview
//!
//! This module provides:
//! - A typed endpoint table for the accounts and catalog services
//! - Bearer-authenticated catalog requests with one refresh-and-retry on 401
//! - JSON decoding into the shared wire types
//! - Failure classification with user-facing status messages
//! - Unauthenticated downloads for artwork and preview clips

pub mod api;
pub mod connector;
pub mod endpoint;
pub mod error;

pub use api::CatalogApi;
pub use connector::SpotifyConnector;
pub use endpoint::{AuthKind, Base, Endpoint};
pub use error::{status_message, ApiError, Result};
