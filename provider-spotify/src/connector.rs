//! Catalog API connector implementation
//!
//! Implements [`CatalogApi`] over the bridge `HttpClient`, authenticating
//! with the session's bearer token.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_auth::{SessionManager, TokenLease};
use core_library::wire::{
    AlbumData, AlbumsResponse, ArtistData, CategoriesResponse, CategoryData, ErrorResponse,
    Paging, PlayHistory, PlaylistData, PlaylistTrack, PlaylistsResponse, SavedAlbum,
    SearchResponse, TrackData, TracksResponse,
};
use core_runtime::config::ClientConfig;
use core_runtime::events::SignOutReason;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::api::CatalogApi;
use crate::endpoint::Endpoint;
use crate::error::{ApiError, Result};

/// Catalog API connector
///
/// # Authentication
///
/// Every catalog request carries the current access token. A 401 asks the
/// [`SessionManager`] for a refreshed token (one refresh in flight at a
/// time) and replays the request exactly once. A second 401 ends the
/// session and yields [`ApiError::Auth`]. Other failures are returned
/// immediately without retrying.
///
/// # Example
///
/// ```ignore
/// use provider_spotify::{CatalogApi, SpotifyConnector};
///
/// let connector = SpotifyConnector::from_config(&config, session)?;
/// let albums = connector.saved_albums().await?;
/// ```
pub struct SpotifyConnector {
    http_client: Arc<dyn HttpClient>,
    session: Arc<SessionManager>,
    api_base: Url,
    accounts_base: Url,
    timeout: Duration,
}

impl SpotifyConnector {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        session: Arc<SessionManager>,
        api_base_url: &str,
        accounts_base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let parse = |raw: &str| {
            Url::parse(raw).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))
        };
        Ok(Self {
            http_client,
            session,
            api_base: parse(api_base_url)?,
            accounts_base: parse(accounts_base_url)?,
            timeout,
        })
    }

    pub fn from_config(config: &ClientConfig, session: Arc<SessionManager>) -> Result<Self> {
        Self::new(
            config.http_client.clone(),
            session,
            &config.api_base_url,
            &config.accounts_base_url,
            config.http_timeout,
        )
    }

    async fn send(&self, endpoint: &Endpoint, lease: &TokenLease) -> Result<HttpResponse> {
        let url = endpoint.url(&self.api_base, &self.accounts_base)?;
        let request = HttpRequest::new(endpoint.method(), url.as_str())
            .bearer_token(lease.token())
            .header("Accept", "application/json")
            .timeout(self.timeout);
        Ok(self.http_client.execute(request).await?)
    }

    /// Issue an authenticated GET and decode the body as `T`.
    #[instrument(skip(self), fields(path = %endpoint.path()))]
    async fn get<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T> {
        let lease = self.session.access_token().await?;
        let mut response = self.send(&endpoint, &lease).await?;

        if response.status == 401 {
            info!("Access token rejected; refreshing");
            let fresh = self.session.refresh_after_unauthorized(&lease).await?;
            response = self.send(&endpoint, &fresh).await?;

            if response.status == 401 {
                warn!("Still unauthorized after refresh; signing out");
                self.session.force_sign_out(SignOutReason::Unauthorized).await;
                return Err(ApiError::Auth(
                    "Request unauthorized after token refresh".to_string(),
                ));
            }
        }

        decode(&endpoint, &response)
    }
}

/// Decode a response, classifying failures.
fn decode<T: DeserializeOwned>(endpoint: &Endpoint, response: &HttpResponse) -> Result<T> {
    if !response.is_success() {
        let status = error_envelope(response)
            .map(|envelope| envelope.error.status)
            .unwrap_or(response.status);
        warn!(status, path = %endpoint.path(), "Catalog request failed");
        return Err(ApiError::from_status(status));
    }

    serde_json::from_slice::<T>(&response.body).map_err(|e| match error_envelope(response) {
        Some(envelope) => ApiError::from_status(envelope.error.status),
        None => ApiError::Decode(format!("{}: {}", endpoint.path(), e)),
    })
}

fn error_envelope(response: &HttpResponse) -> Option<ErrorResponse> {
    serde_json::from_slice(&response.body).ok()
}

fn tracks_of(page: Paging<PlaylistTrack>) -> Vec<TrackData> {
    page.items.into_iter().filter_map(|item| item.track).collect()
}

#[async_trait]
impl CatalogApi for SpotifyConnector {
    async fn top_artists(&self) -> Result<Vec<ArtistData>> {
        let page: Paging<ArtistData> = self.get(Endpoint::TopArtists).await?;
        Ok(page.items)
    }

    async fn new_releases(&self) -> Result<Vec<AlbumData>> {
        let response: AlbumsResponse = self.get(Endpoint::NewReleases).await?;
        Ok(response.albums.items)
    }

    async fn featured_playlists(&self) -> Result<Vec<PlaylistData>> {
        let response: PlaylistsResponse = self.get(Endpoint::FeaturedPlaylists).await?;
        if let Some(message) = &response.message {
            debug!(%message, "Featured playlists headline");
        }
        Ok(response.playlists.items)
    }

    async fn saved_albums(&self) -> Result<Vec<AlbumData>> {
        let page: Paging<SavedAlbum> = self.get(Endpoint::SavedAlbums).await?;
        Ok(page.items.into_iter().filter_map(|saved| saved.album).collect())
    }

    async fn user_playlists(&self) -> Result<Vec<PlaylistData>> {
        let page: Paging<PlaylistData> = self.get(Endpoint::UserPlaylists).await?;
        Ok(page.items)
    }

    async fn categories(&self) -> Result<Vec<CategoryData>> {
        let response: CategoriesResponse = self.get(Endpoint::Categories).await?;
        Ok(response.categories.items)
    }

    async fn category(&self, id: &str) -> Result<CategoryData> {
        self.get(Endpoint::Category(id.to_string())).await
    }

    async fn category_playlists(&self, id: &str) -> Result<Vec<PlaylistData>> {
        let response: PlaylistsResponse =
            self.get(Endpoint::CategoryPlaylists(id.to_string())).await?;
        Ok(response.playlists.items)
    }

    async fn playlist(&self, id: &str) -> Result<PlaylistData> {
        self.get(Endpoint::Playlist(id.to_string())).await
    }

    async fn playlist_tracks(&self, id: &str) -> Result<Vec<TrackData>> {
        let page: Paging<PlaylistTrack> = self.get(Endpoint::PlaylistTracks(id.to_string())).await?;
        Ok(tracks_of(page))
    }

    async fn album(&self, id: &str) -> Result<AlbumData> {
        self.get(Endpoint::Album(id.to_string())).await
    }

    async fn album_tracks(&self, id: &str) -> Result<Vec<TrackData>> {
        let page: Paging<TrackData> = self.get(Endpoint::AlbumTracks(id.to_string())).await?;
        Ok(page.items)
    }

    async fn artist(&self, id: &str) -> Result<ArtistData> {
        self.get(Endpoint::Artist(id.to_string())).await
    }

    async fn artist_top_tracks(&self, id: &str) -> Result<Vec<TrackData>> {
        let response: TracksResponse = self.get(Endpoint::ArtistTopTracks(id.to_string())).await?;
        Ok(response.tracks)
    }

    async fn recently_played(&self) -> Result<Vec<TrackData>> {
        let page: Paging<PlayHistory> = self.get(Endpoint::RecentlyPlayed).await?;
        Ok(page.items.into_iter().filter_map(|entry| entry.track).collect())
    }

    async fn search(&self, query: &str) -> Result<SearchResponse> {
        self.get(Endpoint::Search(query.to_string())).await
    }

    #[instrument(skip(self))]
    async fn download(&self, url: &str) -> Result<Bytes> {
        let request = HttpRequest::get(url).timeout(self.timeout);
        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            warn!(status = response.status, "Download failed");
            return Err(ApiError::from_status(response.status));
        }
        debug!(bytes = response.body.len(), "Downloaded");
        Ok(response.body)
    }
}
