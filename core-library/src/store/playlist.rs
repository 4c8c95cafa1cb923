//! Playlist rows, partitioned by session tag and category.

use super::{non_empty, remote_id, Entity, Filter, FromWire};
use crate::error::Result;
use crate::models::{Playlist, PlaylistScope, DETAIL_SESSION};
use crate::wire::{primary_image, PlaylistData};
use async_trait::async_trait;
use sqlx::{FromRow, SqliteConnection, SqlitePool};

#[derive(FromRow)]
struct PlaylistRow {
    key: i64,
    remote_id: String,
    session: String,
    category_id: String,
    name: String,
    description: Option<String>,
    kind: Option<String>,
    image_url: Option<String>,
    image: Option<Vec<u8>>,
}

impl From<PlaylistRow> for Playlist {
    fn from(row: PlaylistRow) -> Self {
        Self {
            key: row.key,
            id: row.remote_id,
            name: row.name,
            description: row.description,
            kind: row.kind,
            image_url: row.image_url,
            image: row.image,
            session: non_empty(row.session),
            category: non_empty(row.category_id),
        }
    }
}

#[async_trait]
impl Entity for Playlist {
    type Scope = PlaylistScope;
    type Relations = ();

    const NAME: &'static str = "playlist";
    const TABLE: &'static str = "playlists";

    fn key(&self) -> i64 {
        self.key
    }

    fn filter(scope: &PlaylistScope) -> Filter {
        match scope {
            PlaylistScope::All => Filter::all(),
            PlaylistScope::Session(tag) => Filter::eq("session", tag),
            PlaylistScope::Id(id) => Filter::detail(id),
            PlaylistScope::Category(category) => Filter::eq("category_id", category),
        }
    }

    async fn fetch(pool: &SqlitePool, filter: &Filter) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT key, remote_id, session, category_id, name, description, kind, image_url, image \
             FROM playlists WHERE {} ORDER BY name ASC, key ASC",
            filter.clause()
        );
        let mut query = sqlx::query_as::<_, PlaylistRow>(&sql);
        for value in filter.binds() {
            query = query.bind(value.as_str());
        }
        let rows = query.fetch_all(pool).await?;
        Ok(rows.into_iter().map(Playlist::from).collect())
    }

    async fn persist(pool: &SqlitePool, playlist: &Self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE playlists
            SET name = ?, description = ?, kind = ?, image_url = ?, image = ?
            WHERE key = ?
            "#,
        )
        .bind(&playlist.name)
        .bind(&playlist.description)
        .bind(&playlist.kind)
        .bind(&playlist.image_url)
        .bind(&playlist.image)
        .bind(playlist.key)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Partition a new row lands in: a session tag or a category, never both.
fn partition(scope: &PlaylistScope) -> (&str, &str) {
    match scope {
        PlaylistScope::Session(tag) => (tag, ""),
        PlaylistScope::Id(_) => (DETAIL_SESSION, ""),
        PlaylistScope::Category(category) => ("", category),
        PlaylistScope::All => ("", ""),
    }
}

#[async_trait]
impl FromWire for Playlist {
    type Data = PlaylistData;

    async fn write(
        conn: &mut SqliteConnection,
        scope: &PlaylistScope,
        items: &[PlaylistData],
    ) -> Result<Vec<i64>> {
        let (session, category) = partition(scope);
        let mut keys = Vec::with_capacity(items.len());
        for data in items {
            let key = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO playlists (remote_id, session, category_id, name, description, kind, image_url)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (remote_id, session, category_id) DO UPDATE SET
                    name = COALESCE(NULLIF(excluded.name, ''), playlists.name),
                    description = COALESCE(excluded.description, playlists.description),
                    kind = COALESCE(excluded.kind, playlists.kind),
                    image_url = COALESCE(excluded.image_url, playlists.image_url)
                RETURNING key
                "#,
            )
            .bind(remote_id(data.id.as_deref(), data.name.as_deref()))
            .bind(session)
            .bind(category)
            .bind(data.name.as_deref().unwrap_or_default())
            .bind(&data.description)
            .bind(&data.kind)
            .bind(primary_image(&data.images))
            .fetch_one(&mut *conn)
            .await?;
            keys.push(key);
        }
        Ok(keys)
    }
}
