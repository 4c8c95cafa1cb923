use crate::context::{CatalogContext, LIBRARY};
use crate::DomainResponse;
use core_library::{Album, AlbumScope, Playlist, PlaylistScope};

/// Saved albums and the user's own playlists.
#[derive(Clone)]
pub struct LibraryCoordinator {
    context: CatalogContext,
}

impl LibraryCoordinator {
    pub fn new(context: CatalogContext) -> Self {
        Self { context }
    }

    pub async fn fetch_saved_albums(&self) -> DomainResponse<Vec<Album>> {
        let api = self.context.api();
        self.context
            .fetch(
                "library.albums",
                &self.context.stores().albums,
                AlbumScope::Session(LIBRARY.to_string()),
                || api.saved_albums(),
            )
            .await
    }

    pub async fn refresh_saved_albums(&self) -> DomainResponse<Vec<Album>> {
        let api = self.context.api();
        self.context
            .refresh(
                "library.albums",
                &self.context.stores().albums,
                AlbumScope::Session(LIBRARY.to_string()),
                || api.saved_albums(),
            )
            .await
    }

    pub async fn fetch_playlists(&self) -> DomainResponse<Vec<Playlist>> {
        let api = self.context.api();
        self.context
            .fetch(
                "library.playlists",
                &self.context.stores().playlists,
                PlaylistScope::Session(LIBRARY.to_string()),
                || api.user_playlists(),
            )
            .await
    }

    pub async fn refresh_playlists(&self) -> DomainResponse<Vec<Playlist>> {
        let api = self.context.api();
        self.context
            .refresh(
                "library.playlists",
                &self.context.stores().playlists,
                PlaylistScope::Session(LIBRARY.to_string()),
                || api.user_playlists(),
            )
            .await
    }
}
