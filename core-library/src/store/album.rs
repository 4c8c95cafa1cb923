//! Album rows with their ordered artist links.

use super::artist;
use super::{non_empty, remote_id, Entity, EntityStore, Filter, FromWire};
use crate::error::Result;
use crate::models::{Album, AlbumScope, Artist, DETAIL_SESSION};
use crate::wire::{primary_image, AlbumData};
use async_trait::async_trait;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::sync::Arc;

#[derive(FromRow)]
struct AlbumRow {
    key: i64,
    remote_id: String,
    session: String,
    name: String,
    kind: Option<String>,
    album_type: Option<String>,
    label: Option<String>,
    image_url: Option<String>,
    image: Option<Vec<u8>>,
}

impl AlbumRow {
    fn into_album(self, artists: Vec<Artist>) -> Album {
        Album {
            key: self.key,
            id: self.remote_id,
            name: self.name,
            kind: self.kind,
            album_type: self.album_type,
            label: self.label,
            image_url: self.image_url,
            image: self.image,
            session: non_empty(self.session),
            artists,
        }
    }
}

#[async_trait]
impl Entity for Album {
    type Scope = AlbumScope;
    type Relations = Arc<EntityStore<Artist>>;

    const NAME: &'static str = "album";
    const TABLE: &'static str = "albums";

    fn key(&self) -> i64 {
        self.key
    }

    fn filter(scope: &AlbumScope) -> Filter {
        match scope {
            AlbumScope::All => Filter::all(),
            AlbumScope::Session(tag) => Filter::eq("session", tag),
            AlbumScope::Id(id) => Filter::detail(id),
        }
    }

    fn nested_artists(relations: &Self::Relations) -> Option<&EntityStore<Artist>> {
        Some(relations.as_ref())
    }

    async fn fetch(pool: &SqlitePool, filter: &Filter) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT key, remote_id, session, name, kind, album_type, label, image_url, image \
             FROM albums WHERE {} ORDER BY name ASC, key ASC",
            filter.clause()
        );
        let mut query = sqlx::query_as::<_, AlbumRow>(&sql);
        for value in filter.binds() {
            query = query.bind(value.as_str());
        }
        let rows = query.fetch_all(pool).await?;

        let mut albums = Vec::with_capacity(rows.len());
        for row in rows {
            let artists = artist::linked(pool, "album_artists", "album_key", row.key).await?;
            albums.push(row.into_album(artists));
        }
        Ok(albums)
    }

    async fn persist(pool: &SqlitePool, album: &Self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE albums
            SET name = ?, kind = ?, album_type = ?, label = ?, image_url = ?, image = ?
            WHERE key = ?
            "#,
        )
        .bind(&album.name)
        .bind(&album.kind)
        .bind(&album.album_type)
        .bind(&album.label)
        .bind(&album.image_url)
        .bind(&album.image)
        .bind(album.key)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

async fn upsert(
    conn: &mut SqliteConnection,
    data: &AlbumData,
    remote: &str,
    session: &str,
) -> Result<i64> {
    let key = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO albums (remote_id, session, name, kind, album_type, label, image_url)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (remote_id, session) DO UPDATE SET
            name = COALESCE(NULLIF(excluded.name, ''), albums.name),
            kind = COALESCE(excluded.kind, albums.kind),
            album_type = COALESCE(excluded.album_type, albums.album_type),
            label = COALESCE(excluded.label, albums.label),
            image_url = COALESCE(excluded.image_url, albums.image_url)
        RETURNING key
        "#,
    )
    .bind(remote)
    .bind(session)
    .bind(data.name.as_deref().unwrap_or_default())
    .bind(&data.kind)
    .bind(data.album_type.map(|t| t.as_str()))
    .bind(&data.label)
    .bind(primary_image(&data.images))
    .fetch_one(&mut *conn)
    .await?;
    Ok(key)
}

fn partition(scope: &AlbumScope) -> &str {
    match scope {
        AlbumScope::Session(tag) => tag,
        AlbumScope::Id(_) => DETAIL_SESSION,
        AlbumScope::All => "",
    }
}

/// Nested artists are published on the artist store as a separate batch.
#[async_trait]
impl FromWire for Album {
    type Data = AlbumData;

    async fn write(
        conn: &mut SqliteConnection,
        scope: &AlbumScope,
        items: &[AlbumData],
    ) -> Result<Vec<i64>> {
        let session = partition(scope);
        let mut keys = Vec::with_capacity(items.len());
        for data in items {
            let remote = remote_id(data.id.as_deref(), data.name.as_deref());
            let artist_keys = artist::upsert_nested(conn, &data.artists, &remote).await?;
            let key = upsert(conn, data, &remote, session).await?;
            artist::link(conn, "album_artists", "album_key", key, &artist_keys).await?;
            keys.push(key);
        }
        Ok(keys)
    }
}
