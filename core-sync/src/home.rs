//! Home feed: top artists, new releases and featured playlists.

use crate::context::{CatalogContext, HOME};
use crate::DomainResponse;
use core_library::{Album, AlbumScope, Artist, ArtistScope, Playlist, PlaylistScope};
use tracing::instrument;

/// The three home sections, each with its own outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeFeed {
    pub top_artists: DomainResponse<Vec<Artist>>,
    pub new_releases: DomainResponse<Vec<Album>>,
    pub featured_playlists: DomainResponse<Vec<Playlist>>,
}

#[derive(Clone)]
pub struct HomeCoordinator {
    context: CatalogContext,
}

impl HomeCoordinator {
    pub fn new(context: CatalogContext) -> Self {
        Self { context }
    }

    /// Fetches every section concurrently. A failing section does not hold
    /// back the others.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self) -> HomeFeed {
        let (top_artists, new_releases, featured_playlists) = tokio::join!(
            self.fetch_top_artists(),
            self.fetch_new_releases(),
            self.fetch_featured_playlists()
        );
        HomeFeed {
            top_artists,
            new_releases,
            featured_playlists,
        }
    }

    pub async fn fetch_top_artists(&self) -> DomainResponse<Vec<Artist>> {
        let api = self.context.api();
        self.context
            .fetch(
                "home.top_artists",
                &self.context.stores().artists,
                ArtistScope::Session(HOME.to_string()),
                || api.top_artists(),
            )
            .await
    }

    pub async fn refresh_top_artists(&self) -> DomainResponse<Vec<Artist>> {
        let api = self.context.api();
        self.context
            .refresh(
                "home.top_artists",
                &self.context.stores().artists,
                ArtistScope::Session(HOME.to_string()),
                || api.top_artists(),
            )
            .await
    }

    pub async fn fetch_new_releases(&self) -> DomainResponse<Vec<Album>> {
        let api = self.context.api();
        self.context
            .fetch(
                "home.new_releases",
                &self.context.stores().albums,
                AlbumScope::Session(HOME.to_string()),
                || api.new_releases(),
            )
            .await
    }

    pub async fn refresh_new_releases(&self) -> DomainResponse<Vec<Album>> {
        let api = self.context.api();
        self.context
            .refresh(
                "home.new_releases",
                &self.context.stores().albums,
                AlbumScope::Session(HOME.to_string()),
                || api.new_releases(),
            )
            .await
    }

    pub async fn fetch_featured_playlists(&self) -> DomainResponse<Vec<Playlist>> {
        let api = self.context.api();
        self.context
            .fetch(
                "home.featured_playlists",
                &self.context.stores().playlists,
                PlaylistScope::Session(HOME.to_string()),
                || api.featured_playlists(),
            )
            .await
    }

    pub async fn refresh_featured_playlists(&self) -> DomainResponse<Vec<Playlist>> {
        let api = self.context.api();
        self.context
            .refresh(
                "home.featured_playlists",
                &self.context.stores().playlists,
                PlaylistScope::Session(HOME.to_string()),
                || api.featured_playlists(),
            )
            .await
    }
}
