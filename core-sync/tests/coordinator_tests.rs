//! Integration tests for the cache-or-fetch coordinators
//!
//! These tests verify:
//! - Cache-first fetches skip the network once a scope holds rows
//! - Refresh replaces a scope with exactly the latest response
//! - Failures surface as `{is_error, message}` and leave the cache alone
//! - Artwork and preview bytes are written through to the stored row
//! - Artist top tracks and detail rows never borrow another screen's rows
//! - Search never persists and the newest query wins

use async_trait::async_trait;
use bytes::Bytes;
use core_library::db::create_test_pool;
use core_library::observer::StoreChange;
use core_library::wire::{
    AlbumData, ArtistData, CategoryData, Followers, ImageData, Paging, PlaylistData, SearchItem,
    SearchResponse, TrackData,
};
use core_library::{Album, AlbumScope, Stores, TrackScope};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use core_sync::{
    ArtworkCoordinator, CatalogContext, HomeCoordinator, LibraryCoordinator, SearchCoordinator,
    SearchOutcome, TracksCoordinator,
};
use mockall::mock;
use provider_spotify::{ApiError, CatalogApi, Result as ApiResult};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

mock! {
    Catalog {}

    #[async_trait]
    impl CatalogApi for Catalog {
        async fn top_artists(&self) -> ApiResult<Vec<ArtistData>>;
        async fn new_releases(&self) -> ApiResult<Vec<AlbumData>>;
        async fn featured_playlists(&self) -> ApiResult<Vec<PlaylistData>>;
        async fn saved_albums(&self) -> ApiResult<Vec<AlbumData>>;
        async fn user_playlists(&self) -> ApiResult<Vec<PlaylistData>>;
        async fn categories(&self) -> ApiResult<Vec<CategoryData>>;
        async fn category(&self, id: &str) -> ApiResult<CategoryData>;
        async fn category_playlists(&self, id: &str) -> ApiResult<Vec<PlaylistData>>;
        async fn playlist(&self, id: &str) -> ApiResult<PlaylistData>;
        async fn playlist_tracks(&self, id: &str) -> ApiResult<Vec<TrackData>>;
        async fn album(&self, id: &str) -> ApiResult<AlbumData>;
        async fn album_tracks(&self, id: &str) -> ApiResult<Vec<TrackData>>;
        async fn artist(&self, id: &str) -> ApiResult<ArtistData>;
        async fn artist_top_tracks(&self, id: &str) -> ApiResult<Vec<TrackData>>;
        async fn recently_played(&self) -> ApiResult<Vec<TrackData>>;
        async fn search(&self, query: &str) -> ApiResult<SearchResponse>;
        async fn download(&self, url: &str) -> ApiResult<Bytes>;
    }
}

struct Harness {
    stores: Stores,
    events: EventBus,
    context: CatalogContext,
}

async fn harness(api: impl CatalogApi + 'static) -> Harness {
    let stores = Stores::new(create_test_pool().await.unwrap());
    let events = EventBus::new(32);
    let context = CatalogContext::new(Arc::new(api), stores.clone(), events.clone());
    Harness {
        stores,
        events,
        context,
    }
}

fn album(id: &str, name: &str) -> AlbumData {
    AlbumData {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        artists: vec![ArtistData {
            id: Some("ar1".to_string()),
            name: Some("John Coltrane".to_string()),
            ..Default::default()
        }],
        images: vec![ImageData {
            url: Some(format!("https://img.example/{}", id)),
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn track(id: &str, name: &str) -> TrackData {
    TrackData {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        preview_url: Some(format!("https://p.example/{}", id)),
        ..Default::default()
    }
}

fn performer(id: &str, name: &str) -> ArtistData {
    ArtistData {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        ..Default::default()
    }
}

fn track_by(id: &str, name: &str, artists: Vec<ArtistData>) -> TrackData {
    TrackData {
        artists,
        ..track(id, name)
    }
}

fn names(albums: &[Album]) -> Vec<&str> {
    albums.iter().map(|a| a.name.as_str()).collect()
}

#[tokio::test]
async fn test_cached_scope_skips_network() {
    let mut api = MockCatalog::new();
    api.expect_saved_albums()
        .times(1)
        .returning(|| Ok(vec![album("al2", "Giant Steps"), album("al1", "Blue Train")]));
    let h = harness(api).await;
    let library = LibraryCoordinator::new(h.context.clone());

    let first = library.fetch_saved_albums().await;
    let second = library.fetch_saved_albums().await;

    assert!(!first.is_error);
    assert_eq!(names(&first.result), ["Blue Train", "Giant Steps"]);
    assert_eq!(first, second);
    assert_eq!(second.result[0].artists[0].name, "John Coltrane");
}

#[tokio::test]
async fn test_refresh_replaces_scope() {
    let mut api = MockCatalog::new();
    let mut calls = 0;
    api.expect_saved_albums().times(2).returning(move || {
        calls += 1;
        if calls == 1 {
            Ok(vec![album("al1", "Blue Train"), album("al2", "Giant Steps")])
        } else {
            Ok(vec![album("al2", "Giant Steps"), album("al3", "Ballads")])
        }
    });
    let h = harness(api).await;
    let library = LibraryCoordinator::new(h.context.clone());
    library.fetch_saved_albums().await;

    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    let _subscription = h.stores.albums.subscribe(move |change: &StoreChange<Album>| {
        sink.lock().unwrap().push(change.clone());
    });
    let mut events = h.events.subscribe();

    let refreshed = library.refresh_saved_albums().await;

    assert_eq!(names(&refreshed.result), ["Ballads", "Giant Steps"]);
    let stored = h
        .stores
        .albums
        .scoped(AlbumScope::Session("library".to_string()))
        .await
        .list()
        .await
        .unwrap();
    assert_eq!(stored, refreshed.result);

    let changes = changes.lock().unwrap();
    assert!(changes
        .iter()
        .any(|c| matches!(c, StoreChange::Delete { .. })));
    assert!(changes
        .iter()
        .any(|c| matches!(c, StoreChange::Insert { .. })));

    match events.try_recv().unwrap() {
        CoreEvent::Cache(CacheEvent::Refreshed { domain, count }) => {
            assert_eq!(domain, "library.albums");
            assert_eq!(count, 2);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_refresh_keeps_cache() {
    let mut api = MockCatalog::new();
    let mut calls = 0;
    api.expect_saved_albums().times(2).returning(move || {
        calls += 1;
        if calls == 1 {
            Ok(vec![album("al1", "Blue Train")])
        } else {
            Err(ApiError::from_status(503))
        }
    });
    let h = harness(api).await;
    let library = LibraryCoordinator::new(h.context.clone());
    library.fetch_saved_albums().await;
    let mut events = h.events.subscribe();

    let refreshed = library.refresh_saved_albums().await;

    assert!(refreshed.is_error);
    assert!(refreshed.result.is_empty());
    assert_eq!(
        refreshed.message.as_deref(),
        Some("All services are currently unavailable, please try again later")
    );
    assert!(matches!(
        events.try_recv().unwrap(),
        CoreEvent::Cache(CacheEvent::FetchFailed { .. })
    ));

    let cached = library.fetch_saved_albums().await;
    assert_eq!(names(&cached.result), ["Blue Train"]);
}

#[tokio::test]
async fn test_failed_fetch_on_empty_cache() {
    let mut api = MockCatalog::new();
    api.expect_user_playlists()
        .returning(|| Err(ApiError::Auth("refresh rejected".to_string())));
    let h = harness(api).await;

    let response = LibraryCoordinator::new(h.context.clone())
        .fetch_playlists()
        .await;

    assert!(response.is_error);
    assert!(response.result.is_empty());
    assert_eq!(response.message.as_deref(), Some("The session has expired"));
}

#[tokio::test]
async fn test_session_tags_are_independent() {
    let mut api = MockCatalog::new();
    api.expect_new_releases()
        .times(1)
        .returning(|| Ok(vec![album("al1", "Blue Train")]));
    api.expect_saved_albums()
        .times(2)
        .returning(|| Ok(vec![album("al1", "Blue Train")]));
    let h = harness(api).await;
    let home = HomeCoordinator::new(h.context.clone());
    let library = LibraryCoordinator::new(h.context.clone());

    let on_home = home.fetch_new_releases().await;
    let in_library = library.fetch_saved_albums().await;
    library.refresh_saved_albums().await;

    assert_ne!(on_home.result[0].key, in_library.result[0].key);
    let all = h.stores.albums.scoped(AlbumScope::All).await.count().await.unwrap();
    assert_eq!(all, 2);
    let still_home = home.fetch_new_releases().await;
    assert_eq!(still_home.result, on_home.result);
}

#[tokio::test]
async fn test_home_sections_complete_independently() {
    let mut api = MockCatalog::new();
    api.expect_top_artists().returning(|| {
        Ok(vec![ArtistData {
            id: Some("ar9".to_string()),
            name: Some("Alice Coltrane".to_string()),
            ..Default::default()
        }])
    });
    api.expect_new_releases()
        .returning(|| Err(ApiError::Transport("connection reset".to_string())));
    api.expect_featured_playlists().returning(|| {
        Ok(vec![PlaylistData {
            id: Some("p1".to_string()),
            name: Some("Jazz Classics".to_string()),
            ..Default::default()
        }])
    });
    let h = harness(api).await;

    let feed = HomeCoordinator::new(h.context.clone()).fetch_all().await;

    assert_eq!(feed.top_artists.result[0].name, "Alice Coltrane");
    assert!(feed.new_releases.is_error);
    assert_eq!(feed.featured_playlists.result[0].name, "Jazz Classics");
}

#[tokio::test]
async fn test_album_detail_caches_embedded_tracks() {
    let mut api = MockCatalog::new();
    api.expect_album().times(1).returning(|_| {
        let mut data = album("al1", "Blue Train");
        data.tracks = Some(Paging {
            items: vec![track("t2", "Moment's Notice"), track("t1", "Blue Train")],
            ..Paging::default()
        });
        Ok(data)
    });
    api.expect_album_tracks().times(0);
    let h = harness(api).await;
    let tracks = TracksCoordinator::new(h.context.clone());

    let detail = tracks.album("al1").await;
    let again = tracks.album("al1").await;
    let listed = tracks.fetch_album_tracks("al1").await;

    assert_eq!(detail.result.as_ref().unwrap().name, "Blue Train");
    assert_eq!(detail, again);
    let titles: Vec<&str> = listed.result.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(titles, ["Blue Train", "Moment's Notice"]);
    assert_eq!(listed.result[0].album_name.as_deref(), Some("Blue Train"));
}

#[tokio::test]
async fn test_cover_image_is_written_through() {
    let mut api = MockCatalog::new();
    api.expect_saved_albums()
        .returning(|| Ok(vec![album("al1", "Blue Train")]));
    api.expect_download()
        .times(1)
        .returning(|_| Ok(Bytes::from_static(b"jpeg")));
    let h = harness(api).await;
    let library = LibraryCoordinator::new(h.context.clone());
    let artwork = ArtworkCoordinator::new(h.context.clone());
    let stale = library.fetch_saved_albums().await.result.remove(0);

    let first = artwork.album_cover(&stale).await;
    let second = artwork.album_cover(&stale).await;

    assert_eq!(first.result, b"jpeg");
    assert_eq!(second.result, b"jpeg");
    let cached = library.fetch_saved_albums().await;
    assert_eq!(cached.result[0].image.as_deref(), Some(&b"jpeg"[..]));
}

#[tokio::test]
async fn test_missing_urls_report_unavailable() {
    let mut api = MockCatalog::new();
    api.expect_saved_albums().returning(|| {
        let mut data = album("al1", "Blue Train");
        data.images.clear();
        Ok(vec![data])
    });
    api.expect_playlist_tracks().returning(|_| {
        let mut data = track("t1", "Naima");
        data.preview_url = None;
        Ok(vec![data])
    });
    api.expect_download().times(0);
    let h = harness(api).await;
    let artwork = ArtworkCoordinator::new(h.context.clone());

    let album = LibraryCoordinator::new(h.context.clone())
        .fetch_saved_albums()
        .await
        .result
        .remove(0);
    let track = TracksCoordinator::new(h.context.clone())
        .fetch_playlist_tracks("p1")
        .await
        .result
        .remove(0);

    let image = artwork.album_cover(&album).await;
    let preview = artwork.fetch_preview_audio(&track).await;

    assert_eq!(image.message.as_deref(), Some("No image available"));
    assert_eq!(preview.message.as_deref(), Some("No preview available"));
}

#[tokio::test]
async fn test_preview_audio_is_written_through() {
    let mut api = MockCatalog::new();
    api.expect_playlist_tracks()
        .returning(|_| Ok(vec![track("t1", "Naima")]));
    api.expect_download()
        .times(1)
        .returning(|_| Ok(Bytes::from_static(b"mp3")));
    let h = harness(api).await;
    let tracks = TracksCoordinator::new(h.context.clone());
    let artwork = ArtworkCoordinator::new(h.context.clone());
    let naima = tracks.fetch_playlist_tracks("p1").await.result.remove(0);

    artwork.fetch_preview_audio(&naima).await;

    let stored = h
        .stores
        .tracks
        .scoped(TrackScope::Playlist("p1".to_string()))
        .await
        .read(0)
        .await
        .unwrap();
    assert_eq!(stored.preview.as_deref(), Some(&b"mp3"[..]));
    assert_eq!(artwork.fetch_preview_audio(&stored).await.result, b"mp3");
}

#[tokio::test]
async fn test_blank_search_skips_network() {
    let mut api = MockCatalog::new();
    api.expect_search().times(0);
    let h = harness(api).await;
    let search = SearchCoordinator::new(h.context.clone());

    let outcome = search.search("   ").await;

    let response = outcome.into_response().unwrap();
    assert!(!response.is_error);
    assert!(response.result.is_empty());
}

#[tokio::test]
async fn test_search_is_not_persisted() {
    let mut api = MockCatalog::new();
    api.expect_search().returning(|_| {
        Ok(SearchResponse {
            albums: Some(Paging {
                items: vec![SearchItem {
                    id: "al1".to_string(),
                    name: "Blue Train".to_string(),
                    ..Default::default()
                }],
                ..Paging::default()
            }),
            ..Default::default()
        })
    });
    let h = harness(api).await;

    let outcome = SearchCoordinator::new(h.context.clone())
        .search("coltrane")
        .await;

    let response = outcome.into_response().unwrap();
    assert_eq!(response.result.len(), 1);
    let stored = h.stores.albums.scoped(AlbumScope::All).await.count().await.unwrap();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_artist_top_tracks_do_not_overlap() {
    let requested = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requested);
    let mut api = MockCatalog::new();
    api.expect_artist_top_tracks().returning(move |id| {
        log.lock().unwrap().push(id.to_string());
        let ella = performer("arA", "Ella Fitzgerald");
        let louis = performer("arB", "Louis Armstrong");
        let duet = track_by("t1", "Dream a Little Dream", vec![ella.clone(), louis.clone()]);
        Ok(match id {
            "arA" => vec![duet, track_by("t2", "Summertime", vec![ella])],
            _ => vec![
                duet,
                track_by("t3", "What a Wonderful World", vec![louis.clone()]),
                track_by("t4", "La Vie en Rose", vec![louis]),
            ],
        })
    });
    let h = harness(api).await;
    let tracks = TracksCoordinator::new(h.context.clone());

    let ella = tracks.fetch_artist_tracks("arA").await;
    let louis = tracks.fetch_artist_tracks("arB").await;

    assert_eq!(ella.result.len(), 2);
    assert_eq!(louis.result.len(), 3);
    assert_eq!(*requested.lock().unwrap(), ["arA", "arB"]);

    tracks.refresh_artist_tracks("arA").await;
    let cached = tracks.fetch_artist_tracks("arB").await;
    assert_eq!(cached, louis);
    assert_eq!(requested.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_detail_lookups_skip_nested_copies() {
    let mut api = MockCatalog::new();
    api.expect_saved_albums()
        .returning(|| Ok(vec![album("al1", "Blue Train")]));
    api.expect_artist().times(1).returning(|id| {
        Ok(ArtistData {
            images: vec![ImageData {
                url: Some("https://img.example/ar1".to_string()),
                ..Default::default()
            }],
            followers: Some(Followers {
                href: None,
                total: Some(1200),
            }),
            ..performer(id, "John Coltrane")
        })
    });
    api.expect_album().times(1).returning(|id| {
        let mut data = album(id, "Blue Train");
        data.label = Some("Blue Note".to_string());
        Ok(data)
    });
    api.expect_download()
        .times(1)
        .returning(|_| Ok(Bytes::from_static(b"png")));
    let h = harness(api).await;
    let tracks = TracksCoordinator::new(h.context.clone());
    let artwork = ArtworkCoordinator::new(h.context.clone());
    LibraryCoordinator::new(h.context.clone())
        .fetch_saved_albums()
        .await;

    let artist = tracks.artist("ar1").await.result.unwrap();
    assert_eq!(artist.followers, Some(1200));
    assert_eq!(tracks.artist("ar1").await.result, Some(artist.clone()));
    assert_eq!(artwork.artist_image(&artist).await.result, b"png");

    let album = tracks.album("al1").await.result.unwrap();
    assert_eq!(album.label.as_deref(), Some("Blue Note"));
    assert_eq!(tracks.album("al1").await.result, Some(album));
}

/// Catalog whose first search blocks until released.
struct GatedSearch {
    gate: Notify,
    calls: Mutex<usize>,
}

#[async_trait]
impl CatalogApi for GatedSearch {
    async fn search(&self, query: &str) -> ApiResult<SearchResponse> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if call == 1 {
            self.gate.notified().await;
        }
        Ok(SearchResponse {
            artists: Some(Paging {
                items: vec![SearchItem {
                    id: query.to_string(),
                    name: query.to_string(),
                    ..Default::default()
                }],
                ..Paging::default()
            }),
            ..Default::default()
        })
    }

    async fn top_artists(&self) -> ApiResult<Vec<ArtistData>> {
        unreachable!()
    }
    async fn new_releases(&self) -> ApiResult<Vec<AlbumData>> {
        unreachable!()
    }
    async fn featured_playlists(&self) -> ApiResult<Vec<PlaylistData>> {
        unreachable!()
    }
    async fn saved_albums(&self) -> ApiResult<Vec<AlbumData>> {
        unreachable!()
    }
    async fn user_playlists(&self) -> ApiResult<Vec<PlaylistData>> {
        unreachable!()
    }
    async fn categories(&self) -> ApiResult<Vec<CategoryData>> {
        unreachable!()
    }
    async fn category(&self, _id: &str) -> ApiResult<CategoryData> {
        unreachable!()
    }
    async fn category_playlists(&self, _id: &str) -> ApiResult<Vec<PlaylistData>> {
        unreachable!()
    }
    async fn playlist(&self, _id: &str) -> ApiResult<PlaylistData> {
        unreachable!()
    }
    async fn playlist_tracks(&self, _id: &str) -> ApiResult<Vec<TrackData>> {
        unreachable!()
    }
    async fn album(&self, _id: &str) -> ApiResult<AlbumData> {
        unreachable!()
    }
    async fn album_tracks(&self, _id: &str) -> ApiResult<Vec<TrackData>> {
        unreachable!()
    }
    async fn artist(&self, _id: &str) -> ApiResult<ArtistData> {
        unreachable!()
    }
    async fn artist_top_tracks(&self, _id: &str) -> ApiResult<Vec<TrackData>> {
        unreachable!()
    }
    async fn recently_played(&self) -> ApiResult<Vec<TrackData>> {
        unreachable!()
    }
    async fn download(&self, _url: &str) -> ApiResult<Bytes> {
        unreachable!()
    }
}

#[tokio::test]
async fn test_newer_search_supersedes_older() {
    let api = Arc::new(GatedSearch {
        gate: Notify::new(),
        calls: Mutex::new(0),
    });
    let stores = Stores::new(create_test_pool().await.unwrap());
    let context = CatalogContext::new(api.clone(), stores, EventBus::new(8));
    let search = Arc::new(SearchCoordinator::new(context));

    let older = tokio::spawn({
        let search = Arc::clone(&search);
        async move { search.search("col").await }
    });
    while *api.calls.lock().unwrap() == 0 {
        tokio::task::yield_now().await;
    }

    let newer = search.search("coltrane").await;
    api.gate.notify_one();

    assert_eq!(older.await.unwrap(), SearchOutcome::Superseded);
    let response = newer.into_response().unwrap();
    assert_eq!(response.result[0].name, "coltrane");
}
