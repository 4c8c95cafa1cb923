//! Integration tests for the entity stores
//!
//! These tests verify:
//! - Upsert identity per session tag and per parent
//! - Scoped erase and positional access
//! - Change batches delivered to observers, including nested artist batches
//! - Write-through updates of cached artwork
//! - All-or-nothing batch writes and pruning of orphaned nested artists

use core_library::db::create_test_pool;
use core_library::models::*;
use core_library::observer::StoreChange;
use core_library::wire::{AlbumData, ArtistData, ImageData, PlaylistData, TrackData};
use core_library::{LibraryError, Stores};
use std::sync::{Arc, Mutex};

async fn setup_stores() -> Stores {
    Stores::new(create_test_pool().await.unwrap())
}

fn artist(id: &str, name: &str) -> ArtistData {
    ArtistData {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        ..Default::default()
    }
}

fn album(id: &str, name: &str, artists: Vec<ArtistData>) -> AlbumData {
    AlbumData {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        kind: Some("album".to_string()),
        artists,
        images: vec![ImageData {
            url: Some(format!("https://img.example/{}", id)),
            height: Some(640),
            width: Some(640),
        }],
        ..Default::default()
    }
}

fn track(id: &str, name: &str, artists: Vec<ArtistData>) -> TrackData {
    TrackData {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        preview_url: Some(format!("https://p.example/{}", id)),
        artists,
        ..Default::default()
    }
}

fn label<E>(change: &StoreChange<E>) -> String {
    match change {
        StoreChange::WillChange => "will".to_string(),
        StoreChange::Insert { index, .. } => format!("insert {}", index),
        StoreChange::Delete { index } => format!("delete {}", index),
        StoreChange::Update { index, .. } => format!("update {}", index),
        StoreChange::Move { from, to, .. } => format!("move {}->{}", from, to),
        StoreChange::DidChange => "did".to_string(),
    }
}

fn tag(value: &str) -> String {
    value.to_string()
}

#[tokio::test]
async fn test_same_album_in_two_sessions_is_two_rows() {
    let stores = setup_stores().await;
    let data = album("al1", "Kind of Blue", vec![artist("ar1", "Miles Davis")]);

    stores
        .albums
        .scoped(AlbumScope::Session(tag("library")))
        .await
        .create(&data)
        .await
        .unwrap();
    stores
        .albums
        .scoped(AlbumScope::Session(tag("new_releases")))
        .await
        .create(&data)
        .await
        .unwrap();

    let library = stores.albums.scoped(AlbumScope::Session(tag("library"))).await;
    assert_eq!(library.count().await.unwrap(), 1);
    drop(library);

    let all = stores.albums.scoped(AlbumScope::All).await;
    assert_eq!(all.count().await.unwrap(), 2);
    drop(all);

    // Nested artists are untagged and shared
    let artists = stores.artists.scoped(ArtistScope::All).await;
    let rows = artists.list().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].session.is_none());
}

#[tokio::test]
async fn test_repeat_fetch_updates_in_place() {
    let stores = setup_stores().await;
    let mut library = stores.albums.scoped(AlbumScope::Session(tag("library"))).await;

    let first = library
        .create(&album("al1", "Kind of Blue", vec![artist("ar1", "Miles Davis")]))
        .await
        .unwrap();
    let second = library
        .create(&album(
            "al1",
            "Kind of Blue (Legacy)",
            vec![artist("ar1", "Miles Davis"), artist("ar2", "John Coltrane")],
        ))
        .await
        .unwrap();

    assert_eq!(first.key, second.key);
    assert_eq!(library.count().await.unwrap(), 1);
    assert_eq!(second.name, "Kind of Blue (Legacy)");
    assert_eq!(second.artist_names(), "Miles Davis, John Coltrane");
}

#[tokio::test]
async fn test_refetch_keeps_downloaded_artwork() {
    let stores = setup_stores().await;
    let mut library = stores.albums.scoped(AlbumScope::Session(tag("library"))).await;
    library
        .create(&album("al1", "Blue Train", vec![]))
        .await
        .unwrap();

    let mut cached = library.read(0).await.unwrap();
    cached.set_artwork(vec![0xFF, 0xD8, 0xFF]);
    library.update(&cached).await.unwrap();

    let refetched = library
        .create(&album("al1", "Blue Train", vec![]))
        .await
        .unwrap();
    assert_eq!(refetched.artwork(), Some(&[0xFF, 0xD8, 0xFF][..]));
}

#[tokio::test]
async fn test_erase_only_touches_scope() {
    let stores = setup_stores().await;
    stores
        .playlists
        .scoped(PlaylistScope::Session(tag("featured")))
        .await
        .create_all(&[
            PlaylistData {
                id: Some("p1".to_string()),
                name: Some("Morning".to_string()),
                ..Default::default()
            },
            PlaylistData {
                id: Some("p2".to_string()),
                name: Some("Evening".to_string()),
                ..Default::default()
            },
        ])
        .await
        .unwrap();
    stores
        .playlists
        .scoped(PlaylistScope::Category(tag("jazz")))
        .await
        .create(&PlaylistData {
            id: Some("p1".to_string()),
            name: Some("Morning".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let mut featured = stores
        .playlists
        .scoped(PlaylistScope::Session(tag("featured")))
        .await;
    assert_eq!(featured.erase().await.unwrap(), 2);
    assert_eq!(featured.count().await.unwrap(), 0);

    featured.rescope(PlaylistScope::Category(tag("jazz")));
    let jazz = featured.list().await.unwrap();
    assert_eq!(jazz.len(), 1);
    assert_eq!(jazz[0].category.as_deref(), Some("jazz"));
    assert!(jazz[0].session.is_none());
}

#[tokio::test]
async fn test_create_all_publishes_one_batch() {
    let stores = setup_stores().await;
    let log: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = log.clone();
    let _sub = stores
        .albums
        .subscribe(move |change: &StoreChange<Album>| sink.lock().unwrap().push(label(change)));

    let mut library = stores.albums.scoped(AlbumScope::Session(tag("library"))).await;
    library
        .create_all(&[
            album("al2", "Mingus Ah Um", vec![]),
            album("al1", "Giant Steps", vec![]),
        ])
        .await
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["will", "insert 0", "insert 1", "did"]
    );
    let names: Vec<String> = library
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["Giant Steps", "Mingus Ah Um"]);
}

#[tokio::test]
async fn test_unchanged_refetch_publishes_nothing() {
    let stores = setup_stores().await;
    let mut library = stores.albums.scoped(AlbumScope::Session(tag("library"))).await;
    library
        .create(&album("al1", "Giant Steps", vec![]))
        .await
        .unwrap();

    let log: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = log.clone();
    let _sub = stores
        .albums
        .subscribe(move |change: &StoreChange<Album>| sink.lock().unwrap().push(label(change)));

    library
        .create(&album("al1", "Giant Steps", vec![]))
        .await
        .unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_nested_artists_publish_on_artist_store() {
    let stores = setup_stores().await;
    let log: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = log.clone();
    let _sub = stores
        .artists
        .subscribe(move |change: &StoreChange<Artist>| sink.lock().unwrap().push(label(change)));

    let mut library = stores.albums.scoped(AlbumScope::Session(tag("library"))).await;
    library
        .create(&album(
            "al1",
            "A Love Supreme",
            vec![artist("ar1", "John Coltrane")],
        ))
        .await
        .unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["will", "insert 0", "did"]);
}

#[tokio::test]
async fn test_update_emits_update_at_old_index() {
    let stores = setup_stores().await;
    let mut library = stores.albums.scoped(AlbumScope::Session(tag("library"))).await;
    library
        .create_all(&[album("al1", "A", vec![]), album("al2", "B", vec![])])
        .await
        .unwrap();

    let log: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = log.clone();
    let _sub = stores
        .albums
        .subscribe(move |change: &StoreChange<Album>| sink.lock().unwrap().push(label(change)));

    let mut second = library.read(1).await.unwrap();
    second.set_artwork(vec![1, 2, 3]);
    library.update(&second).await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["will", "update 1", "did"]);
    assert_eq!(library.read(1).await.unwrap().image, Some(vec![1, 2, 3]));
}

#[tokio::test]
async fn test_index_past_end_is_contract_violation() {
    let stores = setup_stores().await;
    let mut library = stores.albums.scoped(AlbumScope::Session(tag("library"))).await;
    library
        .create(&album("al1", "Giant Steps", vec![]))
        .await
        .unwrap();

    let err = library.read(5).await.unwrap_err();
    assert!(err.is_contract_violation());
    assert!(matches!(
        err,
        LibraryError::IndexOutOfRange { index: 5, count: 1, .. }
    ));
    assert!(library.delete(1).await.unwrap_err().is_contract_violation());

    let removed = library.delete(0).await.unwrap();
    assert_eq!(removed.name, "Giant Steps");
    assert_eq!(library.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_track_parent_partitions() {
    let stores = setup_stores().await;
    let data = track("t1", "So What", vec![artist("ar1", "Miles Davis")]);

    stores
        .tracks
        .scoped(TrackScope::Playlist(tag("p1")))
        .await
        .create(&data)
        .await
        .unwrap();
    let in_album = stores
        .tracks
        .scoped(TrackScope::Album(tag("al1")))
        .await
        .create(&data)
        .await
        .unwrap();
    assert_eq!(in_album.parent, TrackParent::Album("al1".to_string()));

    let top = stores
        .tracks
        .scoped(TrackScope::Artist(tag("ar1")))
        .await
        .create(&data)
        .await
        .unwrap();
    assert_eq!(top.parent, TrackParent::Artist("ar1".to_string()));
    assert_eq!(top.artist_names(), "Miles Davis");

    let all = stores.tracks.scoped(TrackScope::All).await;
    assert_eq!(all.count().await.unwrap(), 3);
    drop(all);

    // Artist scope lists only that artist's top tracks
    let by_artist = stores.tracks.scoped(TrackScope::Artist(tag("ar1"))).await;
    let rows = by_artist.list().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].key, top.key);
}

#[tokio::test]
async fn test_track_keeps_embedded_album_display_fields() {
    let stores = setup_stores().await;
    let mut recent = stores.tracks.scoped(TrackScope::Session(tag("recent"))).await;

    let mut data = track("t1", "Naima", vec![artist("ar1", "John Coltrane")]);
    data.album = Some(Box::new(album("al1", "Giant Steps", vec![])));
    let created = recent.create(&data).await.unwrap();

    assert_eq!(created.album_name.as_deref(), Some("Giant Steps"));
    assert_eq!(created.image_url.as_deref(), Some("https://img.example/al1"));
    assert_eq!(created.session.as_deref(), Some("recent"));
    drop(recent);

    // The embedded album is display data only
    let albums = stores.albums.scoped(AlbumScope::All).await;
    assert_eq!(albums.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_dropped_subscription_stops_delivery() {
    let stores = setup_stores().await;
    let log: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = log.clone();
    let sub = stores
        .albums
        .subscribe(move |change: &StoreChange<Album>| sink.lock().unwrap().push(label(change)));
    drop(sub);

    stores
        .albums
        .scoped(AlbumScope::All)
        .await
        .create(&album("al1", "Giant Steps", vec![]))
        .await
        .unwrap();
    assert!(log.lock().unwrap().is_empty());
    assert!(stores.albums.observers().is_empty());
}

#[tokio::test]
async fn test_top_tracks_are_kept_per_artist() {
    let stores = setup_stores().await;
    let duet = track(
        "t1",
        "Duet",
        vec![artist("arA", "Ella Fitzgerald"), artist("arB", "Louis Armstrong")],
    );

    let mut tracks = stores.tracks.scoped(TrackScope::Artist(tag("arA"))).await;
    tracks
        .create_all(&[duet, track("t2", "Solo", vec![artist("arA", "Ella Fitzgerald")])])
        .await
        .unwrap();

    // A shared track does not make another artist's list look cached
    tracks.rescope(TrackScope::Artist(tag("arB")));
    assert_eq!(tracks.count().await.unwrap(), 0);

    tracks
        .replace_all(&[track(
            "t1",
            "Duet",
            vec![artist("arA", "Ella Fitzgerald"), artist("arB", "Louis Armstrong")],
        )])
        .await
        .unwrap();

    tracks.rescope(TrackScope::Artist(tag("arA")));
    tracks.replace_all(&[]).await.unwrap();
    assert_eq!(tracks.count().await.unwrap(), 0);

    tracks.rescope(TrackScope::Artist(tag("arB")));
    let rows = tracks.list().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].artist_names(), "Ella Fitzgerald, Louis Armstrong");
}

#[tokio::test]
async fn test_id_scope_ignores_list_copies() {
    let stores = setup_stores().await;
    stores
        .albums
        .scoped(AlbumScope::Session(tag("library")))
        .await
        .create(&album("al1", "Blue Train", vec![artist("ar1", "John Coltrane")]))
        .await
        .unwrap();

    let detail = stores.albums.scoped(AlbumScope::Id(tag("al1"))).await;
    assert_eq!(detail.count().await.unwrap(), 0);
    drop(detail);

    let nested = stores.artists.scoped(ArtistScope::Id(tag("ar1"))).await;
    assert_eq!(nested.count().await.unwrap(), 0);
}

/// Pool whose `albums` table rejects any row named "Rejected".
async fn stores_rejecting_albums() -> Stores {
    let pool = create_test_pool().await.unwrap();
    sqlx::query(
        "CREATE TRIGGER reject_album BEFORE INSERT ON albums \
         WHEN NEW.name = 'Rejected' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
    )
    .execute(&pool)
    .await
    .unwrap();
    Stores::new(pool)
}

#[tokio::test]
async fn test_failed_replace_keeps_previous_rows() {
    let stores = stores_rejecting_albums().await;
    let mut library = stores.albums.scoped(AlbumScope::Session(tag("library"))).await;
    library
        .create_all(&[
            album("al1", "Blue Train", vec![artist("ar1", "John Coltrane")]),
            album("al2", "Kind of Blue", vec![artist("ar2", "Miles Davis")]),
        ])
        .await
        .unwrap();

    let log: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = log.clone();
    let _sub = stores
        .albums
        .subscribe(move |change: &StoreChange<Album>| sink.lock().unwrap().push(label(change)));

    let err = library
        .replace_all(&[
            album("al3", "Mingus Ah Um", vec![artist("ar3", "Charles Mingus")]),
            album("al4", "Rejected", vec![]),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, LibraryError::Database(_)));
    let names: Vec<String> = library
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["Blue Train", "Kind of Blue"]);
    assert!(log.lock().unwrap().is_empty());
    drop(library);

    let artists = stores.artists.scoped(ArtistScope::All).await;
    assert_eq!(artists.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_failed_create_leaves_scope_empty() {
    let stores = stores_rejecting_albums().await;
    let mut releases = stores
        .albums
        .scoped(AlbumScope::Session(tag("new_releases")))
        .await;

    let result = releases
        .create_all(&[
            album("al1", "Blue Train", vec![artist("ar1", "John Coltrane")]),
            album("al2", "Rejected", vec![]),
        ])
        .await;

    assert!(result.is_err());
    assert_eq!(releases.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_replace_prunes_orphaned_artists() {
    let stores = setup_stores().await;
    stores
        .albums
        .scoped(AlbumScope::Session(tag("new_releases")))
        .await
        .create(&album("al9", "Olé", vec![artist("ar1", "John Coltrane")]))
        .await
        .unwrap();
    stores
        .artists
        .scoped(ArtistScope::Id(tag("ar2")))
        .await
        .create(&artist("ar2", "Miles Davis"))
        .await
        .unwrap();

    let mut library = stores.albums.scoped(AlbumScope::Session(tag("library"))).await;
    library
        .create_all(&[
            album("al1", "Blue Train", vec![artist("ar1", "John Coltrane")]),
            album("al2", "Kind of Blue", vec![artist("ar2", "Miles Davis")]),
            album("al3", "Mingus Ah Um", vec![artist("ar3", "Charles Mingus")]),
        ])
        .await
        .unwrap();
    library
        .replace_all(&[album("al4", "Getz/Gilberto", vec![artist("ar4", "Stan Getz")])])
        .await
        .unwrap();
    drop(library);

    let artists = stores.artists.scoped(ArtistScope::All).await;
    let mut kept: Vec<(String, Option<String>)> = artists
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|a| (a.id, a.session))
        .collect();
    kept.sort();
    assert_eq!(
        kept,
        vec![
            // Still linked from the home feed
            ("ar1".to_string(), None),
            // Nested copy pruned, detail row kept
            ("ar2".to_string(), Some("detail".to_string())),
            ("ar4".to_string(), None),
        ]
    );
}

#[tokio::test]
async fn test_nested_artists_without_id_stay_apart() {
    let stores = setup_stores().await;
    let anonymous = ArtistData {
        name: Some("Traditional".to_string()),
        ..Default::default()
    };
    let mut library = stores.albums.scoped(AlbumScope::Session(tag("library"))).await;
    let created = library
        .create_all(&[
            album("al1", "Irish Airs", vec![anonymous.clone()]),
            album("al2", "Sea Shanties", vec![anonymous]),
        ])
        .await
        .unwrap();
    drop(library);

    assert_ne!(created[0].artists[0].key, created[1].artists[0].key);
    assert_eq!(created[0].artist_names(), "Traditional");
    let artists = stores.artists.scoped(ArtistScope::All).await;
    assert_eq!(artists.count().await.unwrap(), 2);
}
