//! Endpoint table of the accounts and catalog services.

use bridge_traits::http::HttpMethod;
use url::Url;

use crate::error::{ApiError, Result};

/// Number of top artists shown on the home screen
pub const TOP_ARTISTS_LIMIT: u32 = 6;

/// Tracks requested per playlist page
pub const PLAYLIST_TRACKS_LIMIT: u32 = 15;

/// Results requested per search category
pub const SEARCH_LIMIT: u32 = 8;

/// Which service an endpoint lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    Accounts,
    Api,
}

/// How a request authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    /// `Basic base64(client_id:client_secret)`
    Basic,
    /// `Bearer <access token>`
    Bearer,
}

/// Typed descriptor of one remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    AuthorizationCode,
    RefreshToken,
    Album(String),
    AlbumTracks(String),
    Artist(String),
    ArtistTopTracks(String),
    Category(String),
    CategoryPlaylists(String),
    Categories,
    FeaturedPlaylists,
    NewReleases,
    SavedAlbums,
    TopArtists,
    RecentlyPlayed,
    UserPlaylists,
    Playlist(String),
    PlaylistTracks(String),
    Search(String),
}

impl Endpoint {
    pub fn method(&self) -> HttpMethod {
        match self {
            Endpoint::AuthorizationCode | Endpoint::RefreshToken => HttpMethod::Post,
            _ => HttpMethod::Get,
        }
    }

    pub fn base(&self) -> Base {
        match self {
            Endpoint::AuthorizationCode | Endpoint::RefreshToken => Base::Accounts,
            _ => Base::Api,
        }
    }

    pub fn auth(&self) -> AuthKind {
        match self.base() {
            Base::Accounts => AuthKind::Basic,
            Base::Api => AuthKind::Bearer,
        }
    }

    /// Path relative to the service base, without a leading `/`.
    pub fn path(&self) -> String {
        match self {
            Endpoint::AuthorizationCode | Endpoint::RefreshToken => "api/token".to_string(),
            Endpoint::Album(id) => format!("albums/{}", id),
            Endpoint::AlbumTracks(id) => format!("albums/{}/tracks", id),
            Endpoint::Artist(id) => format!("artists/{}", id),
            Endpoint::ArtistTopTracks(id) => format!("artists/{}/top-tracks", id),
            Endpoint::Category(id) => format!("browse/categories/{}", id),
            Endpoint::CategoryPlaylists(id) => format!("browse/categories/{}/playlists", id),
            Endpoint::Categories => "browse/categories".to_string(),
            Endpoint::FeaturedPlaylists => "browse/featured-playlists".to_string(),
            Endpoint::NewReleases => "browse/new-releases".to_string(),
            Endpoint::SavedAlbums => "me/albums".to_string(),
            Endpoint::TopArtists => "me/top/artists".to_string(),
            Endpoint::RecentlyPlayed => "me/player/recently-played".to_string(),
            Endpoint::UserPlaylists => "me/playlists".to_string(),
            Endpoint::Playlist(id) => format!("playlists/{}", id),
            Endpoint::PlaylistTracks(id) => format!("playlists/{}/tracks", id),
            Endpoint::Search(_) => "search".to_string(),
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::ArtistTopTracks(_) => vec![("country", "from_token".to_string())],
            Endpoint::TopArtists => vec![("limit", TOP_ARTISTS_LIMIT.to_string())],
            Endpoint::PlaylistTracks(_) => vec![("limit", PLAYLIST_TRACKS_LIMIT.to_string())],
            Endpoint::Search(query) => vec![
                ("q", query.clone()),
                ("type", "album,artist,playlist".to_string()),
                ("limit", SEARCH_LIMIT.to_string()),
            ],
            _ => Vec::new(),
        }
    }

    /// Absolute URL against the configured service roots.
    pub fn url(&self, api_base: &Url, accounts_base: &Url) -> Result<Url> {
        let base = match self.base() {
            Base::Accounts => accounts_base,
            Base::Api => api_base,
        };
        let mut url = base
            .join(&self.path())
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", self.path(), e)))?;

        let query = self.query();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}
