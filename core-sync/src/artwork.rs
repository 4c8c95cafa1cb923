//! Cover images and preview clips.
//!
//! Bytes are downloaded once and written back onto the stored row, so the
//! next request for the same entity is served without touching the
//! network. Only the row the entity came from is updated; copies of the
//! same remote id under other session tags download their own bytes.

use crate::context::CatalogContext;
use crate::{DomainResponse, Result, SyncError};
use core_library::{Album, Artist, Artwork, Category, Entity, EntityStore, Playlist, Track};
use tracing::{debug, instrument, warn};

/// Where a byte payload lives on an entity.
struct Payload<E> {
    what: &'static str,
    url: fn(&E) -> Option<&str>,
    bytes: fn(&E) -> Option<&[u8]>,
    attach: fn(&mut E, Vec<u8>),
}

impl<E: Artwork> Payload<E> {
    fn artwork() -> Self {
        Self {
            what: "image",
            url: E::artwork_url,
            bytes: E::artwork,
            attach: E::set_artwork,
        }
    }
}

fn preview() -> Payload<Track> {
    Payload {
        what: "preview",
        url: |track| track.preview_url.as_deref(),
        bytes: |track| track.preview.as_deref(),
        attach: |track, bytes| track.preview = Some(bytes),
    }
}

#[derive(Clone)]
pub struct ArtworkCoordinator {
    context: CatalogContext,
}

impl ArtworkCoordinator {
    pub fn new(context: CatalogContext) -> Self {
        Self { context }
    }

    /// Cover image of any stored entity with artwork.
    pub async fn fetch_cover_image<E>(&self, store: &EntityStore<E>, entity: &E) -> DomainResponse<Vec<u8>>
    where
        E: Entity + Artwork,
    {
        let outcome = self.write_through(store, entity, Payload::artwork()).await;
        self.context.respond("artwork.image", outcome)
    }

    pub async fn artist_image(&self, artist: &Artist) -> DomainResponse<Vec<u8>> {
        self.fetch_cover_image(&self.context.stores().artists, artist)
            .await
    }

    pub async fn album_cover(&self, album: &Album) -> DomainResponse<Vec<u8>> {
        self.fetch_cover_image(&self.context.stores().albums, album)
            .await
    }

    pub async fn playlist_cover(&self, playlist: &Playlist) -> DomainResponse<Vec<u8>> {
        self.fetch_cover_image(&self.context.stores().playlists, playlist)
            .await
    }

    pub async fn category_icon(&self, category: &Category) -> DomainResponse<Vec<u8>> {
        self.fetch_cover_image(&self.context.stores().categories, category)
            .await
    }

    /// Preview clip of a track.
    pub async fn fetch_preview_audio(&self, track: &Track) -> DomainResponse<Vec<u8>> {
        let outcome = self
            .write_through(&self.context.stores().tracks, track, preview())
            .await;
        self.context.respond("artwork.preview", outcome)
    }

    #[instrument(skip_all, fields(entity = E::NAME, key = entity.key(), what = payload.what))]
    async fn write_through<E: Entity>(
        &self,
        store: &EntityStore<E>,
        entity: &E,
        payload: Payload<E>,
    ) -> Result<Vec<u8>> {
        if let Some(bytes) = (payload.bytes)(entity) {
            return Ok(bytes.to_vec());
        }

        // The caller's copy may predate an earlier download.
        let stored = store.current().await.find(entity.key()).await?;
        if let Some(bytes) = stored.as_ref().and_then(|row| (payload.bytes)(row)) {
            debug!("Served from cache");
            return Ok(bytes.to_vec());
        }

        let url = stored
            .as_ref()
            .and_then(|row| (payload.url)(row))
            .or_else(|| (payload.url)(entity))
            .ok_or(SyncError::Unavailable(payload.what))?
            .to_string();

        let downloaded = self.context.api().download(&url).await?.to_vec();

        let mut current = store.current().await;
        match current.find(entity.key()).await? {
            Some(mut row) => {
                (payload.attach)(&mut row, downloaded.clone());
                current.update(&row).await?;
            }
            None => warn!("Row removed before the download finished; not cached"),
        }
        Ok(downloaded)
    }
}
