//! Domain models for the entity cache
//!
//! Persisted entities, the track parent variant, per-type scopes and the
//! transient search result.

use crate::wire::{primary_image, SearchItem};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Entities
// =============================================================================

/// Artist, either fetched directly or nested in an album or track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    /// Local row key
    pub key: i64,
    /// Server-assigned id
    pub id: String,
    pub name: String,
    pub kind: Option<String>,
    pub followers: Option<i64>,
    pub popularity: Option<i64>,
    pub image_url: Option<String>,
    /// Downloaded artwork, cached indefinitely
    pub image: Option<Vec<u8>>,
    /// Screen that populated the row; `None` for nested artists
    pub session: Option<String>,
}

/// Album with its ordered artists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub key: i64,
    pub id: String,
    pub name: String,
    pub kind: Option<String>,
    /// `album`, `single` or `compilation`
    pub album_type: Option<String>,
    pub label: Option<String>,
    pub image_url: Option<String>,
    pub image: Option<Vec<u8>>,
    pub session: Option<String>,
    pub artists: Vec<Artist>,
}

impl Album {
    pub fn artist_names(&self) -> String {
        join_names(&self.artists)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub key: i64,
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub kind: Option<String>,
    pub image_url: Option<String>,
    pub image: Option<Vec<u8>>,
    pub session: Option<String>,
    /// Category the playlist was listed under
    pub category: Option<String>,
}

/// Track with its ordered artists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub key: i64,
    pub id: String,
    pub name: String,
    pub kind: Option<String>,
    pub preview_url: Option<String>,
    /// Downloaded preview clip, populated on first play
    pub preview: Option<Vec<u8>>,
    pub popularity: Option<i64>,
    /// Name of the album the track appears on, when the payload embeds it
    pub album_name: Option<String>,
    /// Artwork of that album
    pub image_url: Option<String>,
    pub session: Option<String>,
    /// Fixed at creation
    pub parent: TrackParent,
    pub artists: Vec<Artist>,
}

impl Track {
    /// Artist names joined for display, e.g. `"Miles Davis, John Coltrane"`.
    pub fn artist_names(&self) -> String {
        join_names(&self.artists)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub key: i64,
    pub id: String,
    pub name: String,
    pub icon_url: Option<String>,
    pub icon: Option<Vec<u8>>,
}

fn join_names(artists: &[Artist]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Track parent
// =============================================================================

/// Owner of a track row. A track belongs to one playlist, one album, one
/// artist's top tracks, or nothing (play history).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TrackParent {
    #[default]
    None,
    Playlist(String),
    Album(String),
    /// Top tracks of the artist with this id
    Artist(String),
}

impl TrackParent {
    pub(crate) fn kind_column(&self) -> &'static str {
        match self {
            TrackParent::None => "none",
            TrackParent::Playlist(_) => "playlist",
            TrackParent::Album(_) => "album",
            TrackParent::Artist(_) => "artist",
        }
    }

    pub(crate) fn id_column(&self) -> &str {
        match self {
            TrackParent::None => "",
            TrackParent::Playlist(id) | TrackParent::Album(id) | TrackParent::Artist(id) => id,
        }
    }

    pub(crate) fn from_columns(kind: &str, id: String) -> Self {
        match kind {
            "playlist" => TrackParent::Playlist(id),
            "album" => TrackParent::Album(id),
            "artist" => TrackParent::Artist(id),
            _ => TrackParent::None,
        }
    }
}

// =============================================================================
// Artwork
// =============================================================================

/// Entities with a downloadable picture.
pub trait Artwork {
    fn artwork_url(&self) -> Option<&str>;
    fn artwork(&self) -> Option<&[u8]>;
    fn set_artwork(&mut self, bytes: Vec<u8>);
}

macro_rules! impl_artwork {
    ($ty:ty, $url:ident, $bytes:ident) => {
        impl Artwork for $ty {
            fn artwork_url(&self) -> Option<&str> {
                self.$url.as_deref()
            }

            fn artwork(&self) -> Option<&[u8]> {
                self.$bytes.as_deref()
            }

            fn set_artwork(&mut self, bytes: Vec<u8>) {
                self.$bytes = Some(bytes);
            }
        }
    };
}

impl_artwork!(Artist, image_url, image);
impl_artwork!(Album, image_url, image);
impl_artwork!(Playlist, image_url, image);
impl_artwork!(Category, icon_url, icon);

// =============================================================================
// Scopes
// =============================================================================

/// Session tag of rows written under an `Id` scope.
///
/// Detail rows live apart from list copies and nested artists, so a
/// lookup by id never settles for a sparse row cached by another screen.
pub const DETAIL_SESSION: &str = "detail";

/// Active query of the artist store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ArtistScope {
    #[default]
    All,
    Session(String),
    /// Detail row of one artist
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AlbumScope {
    #[default]
    All,
    Session(String),
    /// Detail row of one album
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaylistScope {
    #[default]
    All,
    Session(String),
    /// Detail row of one playlist
    Id(String),
    /// Playlists listed under a category
    Category(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrackScope {
    #[default]
    All,
    Session(String),
    Id(String),
    /// Tracks of a playlist
    Playlist(String),
    /// Tracks of an album
    Album(String),
    /// Top tracks of an artist
    Artist(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryScope {
    #[default]
    All,
    Id(String),
}

// =============================================================================
// Search
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchKind {
    Album,
    Artist,
    Playlist,
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchKind::Album => "album",
            SearchKind::Artist => "artist",
            SearchKind::Playlist => "playlist",
        };
        f.write_str(s)
    }
}

/// Transient search row. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub name: String,
    pub kind: SearchKind,
    pub image_url: Option<String>,
}

impl SearchResult {
    pub fn from_item(item: &SearchItem, kind: SearchKind) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            kind,
            image_url: primary_image(&item.images),
        }
    }
}
