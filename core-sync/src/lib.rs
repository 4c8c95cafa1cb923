//! # Cache-or-Fetch Coordinators
//!
//! Mediates between the catalog API and the entity stores, one coordinator
//! per screen domain.
//!
//! ## Overview
//!
//! Every domain follows the same policy:
//! - `fetch_*` serves the scoped store when it holds any row and only asks
//!   the network on a true cache miss. Cached data is never considered
//!   stale.
//! - `refresh_*` always asks the network and, on success, replaces the
//!   scope's rows with exactly the response items.
//! - Every call resolves to a [`DomainResponse`]; failures are reported in
//!   it and on the event bus, never propagated.
//!
//! Search is the exception: its results are never stored, and a newer
//! query cancels the one in flight.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{CatalogContext, LibraryCoordinator};
//!
//! let library = LibraryCoordinator::new(CatalogContext::new(api, stores, events));
//! let albums = library.fetch_saved_albums().await;
//! if albums.is_error {
//!     show_error(albums.message.unwrap_or_default());
//! }
//! ```

pub mod artwork;
pub mod browse;
pub mod context;
pub mod error;
pub mod home;
pub mod library;
pub mod recent;
pub mod response;
pub mod search;
pub mod tracks;

pub use artwork::ArtworkCoordinator;
pub use browse::BrowseCoordinator;
pub use context::{CatalogContext, HOME, LIBRARY, RECENT};
pub use error::{Result, SyncError};
pub use home::{HomeCoordinator, HomeFeed};
pub use library::LibraryCoordinator;
pub use recent::RecentCoordinator;
pub use response::DomainResponse;
pub use search::{SearchCoordinator, SearchOutcome};
pub use tracks::TracksCoordinator;
