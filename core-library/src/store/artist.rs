//! Artist rows and nested-artist upserts shared by albums and tracks.

use super::{non_empty, remote_id, Entity, Filter, FromWire};
use crate::error::Result;
use crate::models::{Artist, ArtistScope, DETAIL_SESSION};
use crate::wire::{primary_image, ArtistData};
use async_trait::async_trait;
use sqlx::{FromRow, SqliteConnection, SqlitePool};

#[derive(FromRow)]
pub(crate) struct ArtistRow {
    key: i64,
    remote_id: String,
    session: String,
    name: String,
    kind: Option<String>,
    followers: Option<i64>,
    popularity: Option<i64>,
    image_url: Option<String>,
    image: Option<Vec<u8>>,
}

impl From<ArtistRow> for Artist {
    fn from(row: ArtistRow) -> Self {
        Self {
            key: row.key,
            id: row.remote_id,
            name: row.name,
            kind: row.kind,
            followers: row.followers,
            popularity: row.popularity,
            image_url: row.image_url,
            image: row.image,
            session: non_empty(row.session),
        }
    }
}

const COLUMNS: &str = "key, remote_id, session, name, kind, followers, popularity, image_url, image";

const LINKED_COLUMNS: &str = "a.key AS key, a.remote_id AS remote_id, a.session AS session, \
     a.name AS name, a.kind AS kind, a.followers AS followers, a.popularity AS popularity, \
     a.image_url AS image_url, a.image AS image";

#[async_trait]
impl Entity for Artist {
    type Scope = ArtistScope;
    type Relations = ();

    const NAME: &'static str = "artist";
    const TABLE: &'static str = "artists";

    fn key(&self) -> i64 {
        self.key
    }

    fn filter(scope: &ArtistScope) -> Filter {
        match scope {
            ArtistScope::All => Filter::all(),
            ArtistScope::Session(tag) => Filter::eq("session", tag),
            ArtistScope::Id(id) => Filter::detail(id),
        }
    }

    async fn fetch(pool: &SqlitePool, filter: &Filter) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT {} FROM artists WHERE {} ORDER BY name ASC, key ASC",
            COLUMNS,
            filter.clause()
        );
        let mut query = sqlx::query_as::<_, ArtistRow>(&sql);
        for value in filter.binds() {
            query = query.bind(value.as_str());
        }
        let rows = query.fetch_all(pool).await?;
        Ok(rows.into_iter().map(Artist::from).collect())
    }

    async fn persist(pool: &SqlitePool, artist: &Self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE artists
            SET name = ?, kind = ?, followers = ?, popularity = ?, image_url = ?, image = ?
            WHERE key = ?
            "#,
        )
        .bind(&artist.name)
        .bind(&artist.kind)
        .bind(artist.followers)
        .bind(artist.popularity)
        .bind(&artist.image_url)
        .bind(&artist.image)
        .bind(artist.key)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Insert or update one artist in the `session` partition. Returns its key.
///
/// Fields the payload omits keep their stored value; cached image bytes are
/// never touched.
async fn upsert(
    conn: &mut SqliteConnection,
    data: &ArtistData,
    remote: &str,
    session: &str,
) -> Result<i64> {
    let key = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO artists (remote_id, session, name, kind, followers, popularity, image_url)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (remote_id, session) DO UPDATE SET
            name = COALESCE(NULLIF(excluded.name, ''), artists.name),
            kind = COALESCE(excluded.kind, artists.kind),
            followers = COALESCE(excluded.followers, artists.followers),
            popularity = COALESCE(excluded.popularity, artists.popularity),
            image_url = COALESCE(excluded.image_url, artists.image_url)
        RETURNING key
        "#,
    )
    .bind(remote)
    .bind(session)
    .bind(data.name.as_deref().unwrap_or_default())
    .bind(&data.kind)
    .bind(data.followers.as_ref().and_then(|f| f.total))
    .bind(data.popularity)
    .bind(primary_image(&data.images))
    .fetch_one(&mut *conn)
    .await?;
    Ok(key)
}

/// Id of a nested artist. Artists without one are keyed per owner so two
/// unrelated artists sharing a name stay apart.
fn nested_id(data: &ArtistData, owner: &str) -> String {
    match data.id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("local:{}/{}", owner, data.name.as_deref().unwrap_or_default()),
    }
}

/// Upsert the untagged artists nested in `owner` and return their keys in
/// payload order.
pub(crate) async fn upsert_nested(
    conn: &mut SqliteConnection,
    artists: &[ArtistData],
    owner: &str,
) -> Result<Vec<i64>> {
    let mut keys = Vec::with_capacity(artists.len());
    for artist in artists {
        keys.push(upsert(conn, artist, &nested_id(artist, owner), "").await?);
    }
    Ok(keys)
}

/// Replace the ordered artist links of one owner row.
pub(crate) async fn link(
    conn: &mut SqliteConnection,
    link_table: &str,
    owner_column: &str,
    owner_key: i64,
    artist_keys: &[i64],
) -> Result<()> {
    let clear = format!("DELETE FROM {} WHERE {} = ?", link_table, owner_column);
    sqlx::query(&clear).bind(owner_key).execute(&mut *conn).await?;

    let insert = format!(
        "INSERT OR IGNORE INTO {} ({}, artist_key, position) VALUES (?, ?, ?)",
        link_table, owner_column
    );
    for (position, artist_key) in artist_keys.iter().enumerate() {
        sqlx::query(&insert)
            .bind(owner_key)
            .bind(artist_key)
            .bind(position as i64)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Delete untagged artists no album or track links to. Returns the number
/// removed.
pub(crate) async fn prune_orphans(conn: &mut SqliteConnection) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM artists
        WHERE session = ''
          AND NOT EXISTS (SELECT 1 FROM album_artists l WHERE l.artist_key = artists.key)
          AND NOT EXISTS (SELECT 1 FROM track_artists l WHERE l.artist_key = artists.key)
        "#,
    )
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Artists linked to one owner row, in link order.
pub(crate) async fn linked(
    pool: &SqlitePool,
    link_table: &str,
    owner_column: &str,
    owner_key: i64,
) -> Result<Vec<Artist>> {
    let sql = format!(
        "SELECT {} FROM artists a JOIN {} l ON l.artist_key = a.key WHERE l.{} = ? ORDER BY l.position",
        LINKED_COLUMNS, link_table, owner_column
    );
    let rows = sqlx::query_as::<_, ArtistRow>(&sql)
        .bind(owner_key)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Artist::from).collect())
}

/// Session tag a directly fetched artist lands under.
fn partition(scope: &ArtistScope) -> &str {
    match scope {
        ArtistScope::Session(tag) => tag,
        ArtistScope::Id(_) => DETAIL_SESSION,
        ArtistScope::All => "",
    }
}

#[async_trait]
impl FromWire for Artist {
    type Data = ArtistData;

    async fn write(
        conn: &mut SqliteConnection,
        scope: &ArtistScope,
        items: &[ArtistData],
    ) -> Result<Vec<i64>> {
        let session = partition(scope);
        let mut keys = Vec::with_capacity(items.len());
        for data in items {
            let remote = remote_id(data.id.as_deref(), data.name.as_deref());
            keys.push(upsert(conn, data, &remote, session).await?);
        }
        Ok(keys)
    }
}
