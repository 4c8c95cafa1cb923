//! Track rows, partitioned by session tag and owning parent.

use super::artist;
use super::{non_empty, remote_id, Entity, EntityStore, Filter, FromWire};
use crate::error::Result;
use crate::models::{Artist, Track, TrackParent, TrackScope, DETAIL_SESSION};
use crate::wire::{primary_image, TrackData};
use async_trait::async_trait;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::sync::Arc;

#[derive(FromRow)]
struct TrackRow {
    key: i64,
    remote_id: String,
    session: String,
    parent_kind: String,
    parent_id: String,
    name: String,
    kind: Option<String>,
    preview_url: Option<String>,
    preview: Option<Vec<u8>>,
    popularity: Option<i64>,
    album_name: Option<String>,
    image_url: Option<String>,
}

impl TrackRow {
    fn into_track(self, artists: Vec<Artist>) -> Track {
        Track {
            key: self.key,
            id: self.remote_id,
            name: self.name,
            kind: self.kind,
            preview_url: self.preview_url,
            preview: self.preview,
            popularity: self.popularity,
            album_name: self.album_name,
            image_url: self.image_url,
            session: non_empty(self.session),
            parent: TrackParent::from_columns(&self.parent_kind, self.parent_id),
            artists,
        }
    }
}

fn parent_filter(kind: &str, id: &str) -> Filter {
    Filter::new(
        format!("parent_kind = '{}' AND parent_id = ?", kind),
        vec![id.to_string()],
    )
}

#[async_trait]
impl Entity for Track {
    type Scope = TrackScope;
    type Relations = Arc<EntityStore<Artist>>;

    const NAME: &'static str = "track";
    const TABLE: &'static str = "tracks";

    fn key(&self) -> i64 {
        self.key
    }

    fn filter(scope: &TrackScope) -> Filter {
        match scope {
            TrackScope::All => Filter::all(),
            TrackScope::Session(tag) => Filter::eq("session", tag),
            TrackScope::Id(id) => Filter::detail(id),
            TrackScope::Playlist(id) => parent_filter("playlist", id),
            TrackScope::Album(id) => parent_filter("album", id),
            TrackScope::Artist(id) => parent_filter("artist", id),
        }
    }

    fn nested_artists(relations: &Self::Relations) -> Option<&EntityStore<Artist>> {
        Some(relations.as_ref())
    }

    async fn fetch(pool: &SqlitePool, filter: &Filter) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT key, remote_id, session, parent_kind, parent_id, name, kind, preview_url, \
             preview, popularity, album_name, image_url \
             FROM tracks WHERE {} ORDER BY name ASC, key ASC",
            filter.clause()
        );
        let mut query = sqlx::query_as::<_, TrackRow>(&sql);
        for value in filter.binds() {
            query = query.bind(value.as_str());
        }
        let rows = query.fetch_all(pool).await?;

        let mut tracks = Vec::with_capacity(rows.len());
        for row in rows {
            let artists = artist::linked(pool, "track_artists", "track_key", row.key).await?;
            tracks.push(row.into_track(artists));
        }
        Ok(tracks)
    }

    /// The parent is fixed at creation and never rewritten.
    async fn persist(pool: &SqlitePool, track: &Self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE tracks
            SET name = ?, kind = ?, preview_url = ?, preview = ?, popularity = ?,
                album_name = ?, image_url = ?
            WHERE key = ?
            "#,
        )
        .bind(&track.name)
        .bind(&track.kind)
        .bind(&track.preview_url)
        .bind(&track.preview)
        .bind(track.popularity)
        .bind(&track.album_name)
        .bind(&track.image_url)
        .bind(track.key)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Session tag and parent a new row gets under `scope`.
fn partition(scope: &TrackScope) -> (String, TrackParent) {
    match scope {
        TrackScope::Session(tag) => (tag.clone(), TrackParent::None),
        TrackScope::Id(_) => (DETAIL_SESSION.to_string(), TrackParent::None),
        TrackScope::Playlist(id) => (String::new(), TrackParent::Playlist(id.clone())),
        TrackScope::Album(id) => (String::new(), TrackParent::Album(id.clone())),
        TrackScope::Artist(id) => (String::new(), TrackParent::Artist(id.clone())),
        TrackScope::All => (String::new(), TrackParent::None),
    }
}

async fn upsert(
    conn: &mut SqliteConnection,
    data: &TrackData,
    remote: &str,
    session: &str,
    parent: &TrackParent,
) -> Result<i64> {
    let album_name = data.album.as_ref().and_then(|album| album.name.clone());
    let image_url = data
        .album
        .as_ref()
        .and_then(|album| primary_image(&album.images));

    let key = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO tracks (remote_id, session, parent_kind, parent_id, name, kind,
                            preview_url, popularity, album_name, image_url)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (remote_id, session, parent_kind, parent_id) DO UPDATE SET
            name = COALESCE(NULLIF(excluded.name, ''), tracks.name),
            kind = COALESCE(excluded.kind, tracks.kind),
            preview_url = COALESCE(excluded.preview_url, tracks.preview_url),
            popularity = COALESCE(excluded.popularity, tracks.popularity),
            album_name = COALESCE(excluded.album_name, tracks.album_name),
            image_url = COALESCE(excluded.image_url, tracks.image_url)
        RETURNING key
        "#,
    )
    .bind(remote)
    .bind(session)
    .bind(parent.kind_column())
    .bind(parent.id_column())
    .bind(data.name.as_deref().unwrap_or_default())
    .bind(&data.kind)
    .bind(&data.preview_url)
    .bind(data.popularity)
    .bind(album_name)
    .bind(image_url)
    .fetch_one(&mut *conn)
    .await?;
    Ok(key)
}

/// Under a playlist, album or artist scope the new rows are owned by that
/// parent; under a session scope they carry the tag and an `Id` scope files
/// detail rows. `All` writes untagged rows.
#[async_trait]
impl FromWire for Track {
    type Data = TrackData;

    async fn write(
        conn: &mut SqliteConnection,
        scope: &TrackScope,
        items: &[TrackData],
    ) -> Result<Vec<i64>> {
        let (session, parent) = partition(scope);
        let mut keys = Vec::with_capacity(items.len());
        for data in items {
            let remote = remote_id(data.id.as_deref(), data.name.as_deref());
            let artist_keys = artist::upsert_nested(conn, &data.artists, &remote).await?;
            let key = upsert(conn, data, &remote, &session, &parent).await?;
            artist::link(conn, "track_artists", "track_key", key, &artist_keys).await?;
            keys.push(key);
        }
        Ok(keys)
    }
}
