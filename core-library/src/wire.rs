//! Wire-format payloads returned by the streaming API.
//!
//! Every field the catalog may omit is optional, and list payloads skip
//! `null` entries, so decoding never fails on a sparse object. Stores map
//! these into persisted entities; search results map straight into
//! [`SearchResult`](crate::models::SearchResult).

use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize a list that may be `null` or contain `null` entries.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

/// URL of the first image, which the API orders largest first.
pub fn primary_image(images: &[ImageData]) -> Option<String> {
    images.iter().find_map(|image| image.url.clone())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Followers {
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub total: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub images: Vec<ImageData>,
    #[serde(default)]
    pub followers: Option<Followers>,
    #[serde(default)]
    pub popularity: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlbumType {
    Album,
    Single,
    Compilation,
    #[serde(other)]
    Other,
}

impl AlbumType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlbumType::Album => "album",
            AlbumType::Single => "single",
            AlbumType::Compilation => "compilation",
            AlbumType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlbumData {
    #[serde(default)]
    pub album_type: Option<AlbumType>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub artists: Vec<ArtistData>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub images: Vec<ImageData>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    /// Present on the full album object only
    #[serde(default)]
    pub tracks: Option<Paging<TrackData>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackData {
    #[serde(default, deserialize_with = "lenient_list")]
    pub artists: Vec<ArtistData>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Simplified album; absent on album track listings
    #[serde(default)]
    pub album: Option<Box<AlbumData>>,
    #[serde(default)]
    pub popularity: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistData {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub images: Vec<ImageData>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryData {
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub icons: Vec<ImageData>,
}

/// Offset-paged list wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Paging<T> {
    #[serde(default = "Vec::new", deserialize_with = "lenient_list")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub next: Option<String>,
}

impl<T> Default for Paging<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: None,
            next: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlbumsResponse {
    pub albums: Paging<AlbumData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistsResponse {
    /// Editorial headline sent with featured playlists
    #[serde(default)]
    pub message: Option<String>,
    pub playlists: Paging<PlaylistData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Paging<CategoryData>,
}

/// Artist top tracks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TracksResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub tracks: Vec<TrackData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedAlbum {
    #[serde(default)]
    pub added_at: Option<String>,
    #[serde(default)]
    pub album: Option<AlbumData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    #[serde(default)]
    pub added_at: Option<String>,
    #[serde(default)]
    pub track: Option<TrackData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayContext {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

/// Player history entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayHistory {
    #[serde(default)]
    pub track: Option<TrackData>,
    #[serde(default)]
    pub played_at: Option<String>,
    #[serde(default)]
    pub context: Option<PlayContext>,
}

/// Item of any search result list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub images: Vec<ImageData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub artists: Option<Paging<SearchItem>>,
    #[serde(default)]
    pub albums: Option<Paging<SearchItem>>,
    #[serde(default)]
    pub playlists: Option<Paging<SearchItem>>,
}

/// `{ "error": { "status", "message", "reason" } }` envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub status: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_album_decodes() {
        let album: AlbumData = serde_json::from_str(r#"{"name":"Kind of Blue"}"#).unwrap();
        assert_eq!(album.name.as_deref(), Some("Kind of Blue"));
        assert!(album.artists.is_empty());
        assert!(album.id.is_none());
    }

    #[test]
    fn test_null_items_are_skipped() {
        let response: PlaylistsResponse = serde_json::from_str(
            r#"{"message":"Monday","playlists":{"items":[null,{"id":"p1","name":"Focus","images":null}]}}"#,
        )
        .unwrap();
        assert_eq!(response.playlists.items.len(), 1);
        assert_eq!(response.playlists.items[0].id.as_deref(), Some("p1"));
        assert!(response.playlists.items[0].images.is_empty());
    }

    #[test]
    fn test_unknown_album_type() {
        let album: AlbumData =
            serde_json::from_str(r#"{"album_type":"appears_on","name":"x"}"#).unwrap();
        assert_eq!(album.album_type, Some(AlbumType::Other));
    }

    #[test]
    fn test_track_with_album_and_artists() {
        let track: TrackData = serde_json::from_str(
            r#"{
                "id": "t1",
                "name": "So What",
                "type": "track",
                "preview_url": "https://p.example/t1.mp3",
                "popularity": 71,
                "artists": [{"id": "a1", "name": "Miles Davis"}],
                "album": {"id": "al1", "name": "Kind of Blue", "images": [{"url": "https://i.example/640", "width": 640, "height": 640}]}
            }"#,
        )
        .unwrap();
        assert_eq!(track.artists[0].name.as_deref(), Some("Miles Davis"));
        let album = track.album.unwrap();
        assert_eq!(primary_image(&album.images).as_deref(), Some("https://i.example/640"));
    }

    #[test]
    fn test_error_envelope() {
        let error: ErrorResponse =
            serde_json::from_str(r#"{"error":{"status":404,"message":"Not found"}}"#).unwrap();
        assert_eq!(error.error.status, 404);
        assert!(error.error.reason.is_none());
    }
}
