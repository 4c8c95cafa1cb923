//! Track lists of playlists, albums and artists, plus the detail lookups
//! that lead to them.

use crate::context::CatalogContext;
use crate::{DomainResponse, Result};
use core_library::wire::{AlbumData, TrackData};
use core_library::{
    Album, AlbumScope, Artist, ArtistScope, Playlist, PlaylistScope, Track, TrackScope,
};
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct TracksCoordinator {
    context: CatalogContext,
}

impl TracksCoordinator {
    pub fn new(context: CatalogContext) -> Self {
        Self { context }
    }

    pub async fn fetch_playlist_tracks(&self, id: &str) -> DomainResponse<Vec<Track>> {
        let api = self.context.api();
        self.context
            .fetch(
                "tracks.playlist",
                &self.context.stores().tracks,
                TrackScope::Playlist(id.to_string()),
                || api.playlist_tracks(id),
            )
            .await
    }

    pub async fn refresh_playlist_tracks(&self, id: &str) -> DomainResponse<Vec<Track>> {
        let api = self.context.api();
        self.context
            .refresh(
                "tracks.playlist",
                &self.context.stores().tracks,
                TrackScope::Playlist(id.to_string()),
                || api.playlist_tracks(id),
            )
            .await
    }

    pub async fn fetch_album_tracks(&self, id: &str) -> DomainResponse<Vec<Track>> {
        let api = self.context.api();
        self.context
            .fetch(
                "tracks.album",
                &self.context.stores().tracks,
                TrackScope::Album(id.to_string()),
                || api.album_tracks(id),
            )
            .await
    }

    pub async fn refresh_album_tracks(&self, id: &str) -> DomainResponse<Vec<Track>> {
        let api = self.context.api();
        self.context
            .refresh(
                "tracks.album",
                &self.context.stores().tracks,
                TrackScope::Album(id.to_string()),
                || api.album_tracks(id),
            )
            .await
    }

    /// Top tracks of an artist, kept under that artist alone.
    pub async fn fetch_artist_tracks(&self, id: &str) -> DomainResponse<Vec<Track>> {
        let api = self.context.api();
        self.context
            .fetch(
                "tracks.artist",
                &self.context.stores().tracks,
                TrackScope::Artist(id.to_string()),
                || api.artist_top_tracks(id),
            )
            .await
    }

    pub async fn refresh_artist_tracks(&self, id: &str) -> DomainResponse<Vec<Track>> {
        let api = self.context.api();
        self.context
            .refresh(
                "tracks.artist",
                &self.context.stores().tracks,
                TrackScope::Artist(id.to_string()),
                || api.artist_top_tracks(id),
            )
            .await
    }

    pub async fn playlist(&self, id: &str) -> DomainResponse<Option<Playlist>> {
        let api = self.context.api();
        self.context
            .fetch_one(
                "detail.playlist",
                &self.context.stores().playlists,
                PlaylistScope::Id(id.to_string()),
                || api.playlist(id),
            )
            .await
    }

    pub async fn artist(&self, id: &str) -> DomainResponse<Option<Artist>> {
        let api = self.context.api();
        self.context
            .fetch_one(
                "detail.artist",
                &self.context.stores().artists,
                ArtistScope::Id(id.to_string()),
                || api.artist(id),
            )
            .await
    }

    /// Album detail. A network fetch also caches the embedded track list
    /// under the album, so opening its track list afterwards is a cache hit.
    #[instrument(skip(self))]
    pub async fn album(&self, id: &str) -> DomainResponse<Option<Album>> {
        let outcome = self.load_album(id).await;
        self.context.respond("detail.album", outcome)
    }

    async fn load_album(&self, id: &str) -> Result<Option<Album>> {
        let stores = self.context.stores();
        let scope = AlbumScope::Id(id.to_string());
        {
            let cached = stores.albums.scoped(scope.clone()).await;
            if cached.count().await? > 0 {
                return Ok(Some(cached.read(0).await?));
            }
        }

        let data = self.context.api().album(id).await?;
        let album = {
            let mut scoped = stores.albums.scoped(scope).await;
            scoped.create(&data).await?
        };

        if let Some(paging) = &data.tracks {
            let tracks = with_album(&paging.items, &data);
            debug!(album = id, count = tracks.len(), "Caching embedded tracks");
            self.context
                .replace(
                    "tracks.album",
                    &stores.tracks,
                    TrackScope::Album(id.to_string()),
                    &tracks,
                )
                .await?;
        }
        Ok(Some(album))
    }
}

/// Album tracks arrive without their album; attach its name and images so
/// the rows can be displayed on their own.
fn with_album(tracks: &[TrackData], album: &AlbumData) -> Vec<TrackData> {
    let summary = AlbumData {
        id: album.id.clone(),
        name: album.name.clone(),
        images: album.images.clone(),
        kind: album.kind.clone(),
        ..AlbumData::default()
    };
    tracks
        .iter()
        .cloned()
        .map(|mut track| {
            track
                .album
                .get_or_insert_with(|| Box::new(summary.clone()));
            track
        })
        .collect()
}
