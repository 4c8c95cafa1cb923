//! The catalog operations the coordinators depend on.

use async_trait::async_trait;
use bytes::Bytes;
use core_library::wire::{
    AlbumData, ArtistData, CategoryData, PlaylistData, SearchResponse, TrackData,
};

use crate::error::Result;

/// Typed access to the remote catalog.
///
/// List operations return the page items only; `null` entries in a page are
/// already dropped.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn top_artists(&self) -> Result<Vec<ArtistData>>;
    async fn new_releases(&self) -> Result<Vec<AlbumData>>;
    async fn featured_playlists(&self) -> Result<Vec<PlaylistData>>;
    async fn saved_albums(&self) -> Result<Vec<AlbumData>>;
    async fn user_playlists(&self) -> Result<Vec<PlaylistData>>;
    async fn categories(&self) -> Result<Vec<CategoryData>>;
    async fn category(&self, id: &str) -> Result<CategoryData>;
    async fn category_playlists(&self, id: &str) -> Result<Vec<PlaylistData>>;
    async fn playlist(&self, id: &str) -> Result<PlaylistData>;
    async fn playlist_tracks(&self, id: &str) -> Result<Vec<TrackData>>;
    async fn album(&self, id: &str) -> Result<AlbumData>;
    async fn album_tracks(&self, id: &str) -> Result<Vec<TrackData>>;
    async fn artist(&self, id: &str) -> Result<ArtistData>;
    async fn artist_top_tracks(&self, id: &str) -> Result<Vec<TrackData>>;
    async fn recently_played(&self) -> Result<Vec<TrackData>>;
    async fn search(&self, query: &str) -> Result<SearchResponse>;

    /// Raw bytes behind an image or preview URL. Sent without credentials.
    async fn download(&self, url: &str) -> Result<Bytes>;
}
