//! # Library Cache Module
//!
//! Local cache of catalog and library entities fetched from the streaming
//! API.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite schema and migrations for artists, albums, playlists, tracks and
//!   categories
//! - Scoped entity stores with upsert semantics keyed by remote id and
//!   session tag
//! - Row-level change batches fanned out to registered observers
//! - Wire payload types shared with the remote fetcher

pub mod db;
pub mod diff;
pub mod error;
pub mod models;
pub mod observer;
pub mod store;
pub mod wire;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
pub use models::{
    Album, AlbumScope, Artist, ArtistScope, Artwork, Category, CategoryScope, Playlist,
    PlaylistScope, SearchKind, SearchResult, Track, TrackParent, TrackScope, DETAIL_SESSION,
};
pub use observer::{ObserverRegistry, StoreChange, StoreObserver, Subscription};
pub use store::{Entity, EntityStore, Filter, FromWire, ScopedStore, Stores};
