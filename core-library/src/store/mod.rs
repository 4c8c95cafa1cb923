//! # Entity Store
//!
//! One [`EntityStore`] per entity type, shared by every coordinator.
//!
//! ## Scoped access
//!
//! A store has one active scope. [`EntityStore::scoped`] locks the store,
//! replaces the scope and returns a [`ScopedStore`] guard; every read and
//! mutation runs through the guard, so two callers never interleave scoped
//! work on the same store.
//!
//! ```rust,ignore
//! let mut albums = album_store.scoped(AlbumScope::Session("library".into())).await;
//! if albums.count().await? == 0 {
//!     albums.create_all(&fetched).await?;
//! }
//! let rows = albums.list().await?;
//! ```
//!
//! ## Change batches
//!
//! Each mutation snapshots the scoped result set, applies its SQL in one
//! transaction, reloads and hands the [`diff`](crate::diff::diff) to the
//! store's observers. A failed write rolls back whole, so a scope is never
//! left half filled. A nested upsert (album artists, track artists) locks
//! the nested store in its current scope and publishes there as well.
//! Locks are always taken owner first, then artists.
//!
//! Nested artists are shared, untagged rows. Erasing album or track rows
//! prunes the nested artists no remaining row links to.

mod album;
mod artist;
mod category;
mod playlist;
mod track;

use crate::diff::diff;
use crate::error::{LibraryError, Result};
use crate::models::{Album, Artist, Category, Playlist, Track, DETAIL_SESSION};
use crate::observer::{ObserverRegistry, StoreChange, StoreObserver, Subscription};
use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

/// SQL `WHERE` fragment with its positional text parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    clause: String,
    binds: Vec<String>,
}

impl Filter {
    pub fn new(clause: impl Into<String>, binds: Vec<String>) -> Self {
        Self {
            clause: clause.into(),
            binds,
        }
    }

    pub fn all() -> Self {
        Self::new("1 = 1", Vec::new())
    }

    /// `column = ?`
    pub fn eq(column: &str, value: &str) -> Self {
        Self::new(format!("{} = ?", column), vec![value.to_string()])
    }

    /// Detail row of remote `id`.
    pub fn detail(id: &str) -> Self {
        Self::new(
            "remote_id = ? AND session = ?",
            vec![id.to_string(), DETAIL_SESSION.to_string()],
        )
    }

    /// Single row by local key.
    pub fn key(key: i64) -> Self {
        Self::new(format!("key = {}", key), Vec::new())
    }

    pub fn clause(&self) -> &str {
        &self.clause
    }

    pub fn binds(&self) -> &[String] {
        &self.binds
    }
}

/// A persisted entity type.
#[async_trait]
pub trait Entity: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Query selecting the rows a screen works with
    type Scope: Clone + fmt::Debug + Default + Send + Sync + 'static;
    /// Stores this one upserts into
    type Relations: Send + Sync + 'static;

    const NAME: &'static str;
    const TABLE: &'static str;

    fn key(&self) -> i64;

    /// Hook run before `update`. Every entity is currently accepted.
    fn validate(&self) -> bool {
        true
    }

    fn filter(scope: &Self::Scope) -> Filter;

    /// Artist store this type upserts nested artists into, if any.
    fn nested_artists(_relations: &Self::Relations) -> Option<&EntityStore<Artist>> {
        None
    }

    /// Rows matching `filter`, ordered by name ascending.
    async fn fetch(pool: &SqlitePool, filter: &Filter) -> Result<Vec<Self>>;

    /// Write mutable fields of an existing row. Returns rows affected.
    async fn persist(pool: &SqlitePool, entity: &Self) -> Result<u64>;
}

/// Entities created from a wire payload.
///
/// The active scope decides the partition new rows land in: a session
/// scope tags them, an `Id` scope files them as detail rows, a parent or
/// category scope links them, and any other scope writes untagged rows.
#[async_trait]
pub trait FromWire: Entity {
    type Data: Send + Sync + 'static;

    /// Upsert `items` into the partition `scope` selects and return their
    /// keys in payload order. Runs inside the caller's transaction.
    async fn write(
        conn: &mut SqliteConnection,
        scope: &Self::Scope,
        items: &[Self::Data],
    ) -> Result<Vec<i64>>;
}

async fn load_by_key<E: Entity>(pool: &SqlitePool, key: i64) -> Result<E> {
    E::fetch(pool, &Filter::key(key))
        .await?
        .into_iter()
        .next()
        .ok_or(LibraryError::NotFound {
            entity_type: E::NAME,
            key,
        })
}

/// Server ids are usually present; rows without one are keyed by name.
pub(crate) fn remote_id(id: Option<&str>, name: Option<&str>) -> String {
    match id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("local:{}", name.unwrap_or_default()),
    }
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// One store per entity type over a shared pool. Album and track stores
/// publish their nested artists on `artists`.
#[derive(Clone)]
pub struct Stores {
    pub artists: Arc<EntityStore<Artist>>,
    pub albums: Arc<EntityStore<Album>>,
    pub playlists: Arc<EntityStore<Playlist>>,
    pub tracks: Arc<EntityStore<Track>>,
    pub categories: Arc<EntityStore<Category>>,
}

impl Stores {
    pub fn new(pool: SqlitePool) -> Self {
        let artists = Arc::new(EntityStore::new(pool.clone()));
        Self {
            albums: Arc::new(EntityStore::with_relations(pool.clone(), artists.clone())),
            tracks: Arc::new(EntityStore::with_relations(pool.clone(), artists.clone())),
            playlists: Arc::new(EntityStore::new(pool.clone())),
            categories: Arc::new(EntityStore::new(pool)),
            artists,
        }
    }
}

/// Shared repository of one entity type.
pub struct EntityStore<E: Entity> {
    pool: SqlitePool,
    active: Mutex<E::Scope>,
    observers: ObserverRegistry<E>,
    relations: E::Relations,
}

impl<E: Entity<Relations = ()>> EntityStore<E> {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_relations(pool, ())
    }
}

impl<E: Entity> EntityStore<E> {
    pub fn with_relations(pool: SqlitePool, relations: E::Relations) -> Self {
        Self {
            pool,
            active: Mutex::new(E::Scope::default()),
            observers: ObserverRegistry::new(),
            relations,
        }
    }

    /// Register a change observer for this store.
    #[must_use = "dropping the subscription unregisters the observer"]
    pub fn subscribe<O>(&self, observer: O) -> Subscription
    where
        O: StoreObserver<E> + 'static,
    {
        self.observers.subscribe(observer)
    }

    pub fn observers(&self) -> &ObserverRegistry<E> {
        &self.observers
    }

    /// Lock the store and make `scope` the active query.
    pub async fn scoped(&self, scope: E::Scope) -> ScopedStore<'_, E> {
        let mut active = self.active.lock().await;
        trace!(entity = E::NAME, ?scope, "Re-scoping store");
        *active = scope;
        ScopedStore {
            store: self,
            scope: active,
        }
    }

    /// Lock the store keeping whatever scope is active.
    pub async fn current(&self) -> ScopedStore<'_, E> {
        ScopedStore {
            store: self,
            scope: self.active.lock().await,
        }
    }
}

/// Exclusive, scoped view of a store.
pub struct ScopedStore<'a, E: Entity> {
    store: &'a EntityStore<E>,
    scope: MutexGuard<'a, E::Scope>,
}

impl<'a, E: Entity> ScopedStore<'a, E> {
    pub fn scope(&self) -> &E::Scope {
        &self.scope
    }

    /// Replace the active query. Scopes never combine.
    pub fn rescope(&mut self, scope: E::Scope) {
        *self.scope = scope;
    }

    /// All rows in scope, sorted by name ascending.
    pub async fn list(&self) -> Result<Vec<E>> {
        E::fetch(&self.store.pool, &E::filter(&self.scope)).await
    }

    pub async fn count(&self) -> Result<usize> {
        let filter = E::filter(&self.scope);
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            E::TABLE,
            filter.clause()
        );
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for value in filter.binds() {
            query = query.bind(value.as_str());
        }
        let count = query.fetch_one(&self.store.pool).await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Row at `index` of [`list`](Self::list).
    ///
    /// An index past the end is a caller bug and yields
    /// `LibraryError::IndexOutOfRange`.
    pub async fn read(&self, index: usize) -> Result<E> {
        let rows = self.list().await?;
        let count = rows.len();
        rows.into_iter()
            .nth(index)
            .ok_or(LibraryError::IndexOutOfRange {
                entity: E::NAME,
                index,
                count,
            })
    }

    /// Persist in-place changes such as downloaded artwork.
    pub async fn update(&mut self, entity: &E) -> Result<()> {
        if !entity.validate() {
            warn!(entity = E::NAME, key = entity.key(), "Validation rejected update");
            return Err(LibraryError::ValidationFailed(E::NAME));
        }

        let before = self.snapshot().await?;
        let affected = E::persist(&self.store.pool, entity).await;
        self.publish(before).await?;

        if affected? == 0 {
            return Err(LibraryError::NotFound {
                entity_type: E::NAME,
                key: entity.key(),
            });
        }
        Ok(())
    }

    /// Delete the row at `index` of the scoped result set.
    pub async fn delete(&mut self, index: usize) -> Result<E> {
        let before = self.snapshot().await?;
        let count = before.len();
        let Some(target) = before.get(index).cloned() else {
            return Err(LibraryError::IndexOutOfRange {
                entity: E::NAME,
                index,
                count,
            });
        };

        let nested = self.lock_nested().await?;
        let deleted = self.delete_committed(target.key()).await;
        publish_nested(nested).await?;
        self.publish(before).await?;
        deleted?;

        debug!(entity = E::NAME, index, "Deleted row");
        Ok(target)
    }

    /// Delete every row in scope. Returns the number removed.
    pub async fn erase(&mut self) -> Result<usize> {
        let before = self.snapshot().await?;
        let nested = self.lock_nested().await?;
        let result = self.erase_committed().await;
        publish_nested(nested).await?;
        self.publish(before).await?;

        let removed = result?;
        debug!(entity = E::NAME, scope = ?*self.scope, removed, "Erased scope");
        Ok(removed)
    }

    /// Row with local `key`, whatever the active scope.
    pub async fn find(&self, key: i64) -> Result<Option<E>> {
        Ok(E::fetch(&self.store.pool, &Filter::key(key))
            .await?
            .into_iter()
            .next())
    }

    async fn delete_committed(&self, key: i64) -> Result<()> {
        let mut tx = self.store.pool.begin().await?;
        let sql = format!("DELETE FROM {} WHERE key = ?", E::TABLE);
        sqlx::query(&sql).bind(key).execute(&mut *tx).await?;
        self.prune(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn erase_committed(&self) -> Result<usize> {
        let mut tx = self.store.pool.begin().await?;
        let removed = self.erase_in(&mut tx).await?;
        self.prune(&mut tx).await?;
        tx.commit().await?;
        Ok(removed)
    }

    /// Delete the rows in scope on `conn`.
    async fn erase_in(&self, conn: &mut SqliteConnection) -> Result<usize> {
        let filter = E::filter(&self.scope);
        let sql = format!("DELETE FROM {} WHERE {}", E::TABLE, filter.clause());
        let mut query = sqlx::query(&sql);
        for value in filter.binds() {
            query = query.bind(value.as_str());
        }
        let removed = query.execute(&mut *conn).await?.rows_affected();
        Ok(usize::try_from(removed).unwrap_or_default())
    }

    /// Drop nested artists left without an owner.
    async fn prune(&self, conn: &mut SqliteConnection) -> Result<()> {
        if E::nested_artists(&self.store.relations).is_some() {
            let pruned = artist::prune_orphans(conn).await?;
            if pruned > 0 {
                debug!(entity = E::NAME, pruned, "Pruned orphaned artists");
            }
        }
        Ok(())
    }

    /// Lock the nested artist store and snapshot its current scope.
    async fn lock_nested(&self) -> Result<Option<(ScopedStore<'a, Artist>, Vec<Artist>)>> {
        let store: &'a EntityStore<E> = self.store;
        match E::nested_artists(&store.relations) {
            Some(artists) => {
                let scoped = artists.current().await;
                let before = scoped.snapshot().await?;
                Ok(Some((scoped, before)))
            }
            None => Ok(None),
        }
    }

    pub(crate) async fn snapshot(&self) -> Result<Vec<E>> {
        self.list().await
    }

    /// Reload the scope and notify observers of the difference to `before`.
    pub(crate) async fn publish(&self, before: Vec<E>) -> Result<()> {
        let after = self.list().await?;
        let batch: Vec<StoreChange<E>> = diff(&before, &after, |e| e.key());
        if !batch.is_empty() {
            trace!(
                entity = E::NAME,
                changes = batch.len().saturating_sub(2),
                "Publishing change batch"
            );
            self.store.observers.notify(&batch);
        }
        Ok(())
    }

    pub(crate) async fn load_keys(&self, keys: &[i64]) -> Result<Vec<E>> {
        let mut rows = Vec::with_capacity(keys.len());
        for &key in keys {
            rows.push(load_by_key::<E>(&self.store.pool, key).await?);
        }
        Ok(rows)
    }
}

async fn publish_nested(nested: Option<(ScopedStore<'_, Artist>, Vec<Artist>)>) -> Result<()> {
    match nested {
        Some((artists, before)) => artists.publish(before).await,
        None => Ok(()),
    }
}

impl<E: FromWire> ScopedStore<'_, E> {
    /// Upsert one entity into the active scope's partition.
    pub async fn create(&mut self, data: &E::Data) -> Result<E> {
        self.create_all(std::slice::from_ref(data))
            .await?
            .into_iter()
            .next()
            .ok_or(LibraryError::NothingWritten(E::NAME))
    }

    /// Upsert a batch of entities in one transaction, publishing one change
    /// batch. Returns the written rows in payload order.
    pub async fn create_all(&mut self, items: &[E::Data]) -> Result<Vec<E>> {
        self.write(items, false).await
    }

    /// Erase the scope and upsert `items` in one transaction. On failure
    /// the previous rows stay in place.
    pub async fn replace_all(&mut self, items: &[E::Data]) -> Result<Vec<E>> {
        self.write(items, true).await
    }

    async fn write(&mut self, items: &[E::Data], erase: bool) -> Result<Vec<E>> {
        let before = self.snapshot().await?;
        let nested = self.lock_nested().await?;
        let written = self.write_committed(items, erase).await;
        publish_nested(nested).await?;
        self.publish(before).await?;
        self.load_keys(&written?).await
    }

    async fn write_committed(&self, items: &[E::Data], erase: bool) -> Result<Vec<i64>> {
        let mut tx = self.store.pool.begin().await?;
        if erase {
            self.erase_in(&mut tx).await?;
        }
        let keys = E::write(&mut tx, &self.scope, items).await?;
        if erase {
            self.prune(&mut tx).await?;
        }
        tx.commit().await?;
        Ok(keys)
    }
}
