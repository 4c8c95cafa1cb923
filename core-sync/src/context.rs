//! Shared plumbing for the per-domain coordinators.

use crate::{DomainResponse, Result};
use core_library::{EntityStore, FromWire, Stores};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use provider_spotify::CatalogApi;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Session tag of rows fetched for the home feed.
pub const HOME: &str = "home";
/// Session tag of rows fetched for the user library.
pub const LIBRARY: &str = "library";
/// Session tag of rows fetched from the play history.
pub const RECENT: &str = "recent";

/// Fetcher, stores and event bus shared by every coordinator.
#[derive(Clone)]
pub struct CatalogContext {
    api: Arc<dyn CatalogApi>,
    stores: Stores,
    events: EventBus,
}

impl CatalogContext {
    pub fn new(api: Arc<dyn CatalogApi>, stores: Stores, events: EventBus) -> Self {
        Self {
            api,
            stores,
            events,
        }
    }

    pub fn api(&self) -> &Arc<dyn CatalogApi> {
        &self.api
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Serves the scope from the store when it holds any row, otherwise
    /// fetches and writes the response into it.
    ///
    /// Cached rows are returned however old they are.
    pub(crate) async fn fetch<E, F, Fut>(
        &self,
        domain: &'static str,
        store: &EntityStore<E>,
        scope: E::Scope,
        request: F,
    ) -> DomainResponse<Vec<E>>
    where
        E: FromWire,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = provider_spotify::Result<Vec<E::Data>>> + Send,
    {
        let outcome = self.load_or_fetch(domain, store, scope, request).await;
        self.respond(domain, outcome)
    }

    /// Always hits the network; on success the scope is erased and
    /// repopulated with exactly the response items. On failure the cached
    /// rows are left alone.
    pub(crate) async fn refresh<E, F, Fut>(
        &self,
        domain: &'static str,
        store: &EntityStore<E>,
        scope: E::Scope,
        request: F,
    ) -> DomainResponse<Vec<E>>
    where
        E: FromWire,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = provider_spotify::Result<Vec<E::Data>>> + Send,
    {
        let outcome = match request().await {
            Ok(items) => self.replace(domain, store, scope, &items).await,
            Err(err) => Err(err.into()),
        };
        self.respond(domain, outcome)
    }

    /// Cache-first lookup of a single entity by its `Id` scope.
    pub(crate) async fn fetch_one<E, F, Fut>(
        &self,
        domain: &'static str,
        store: &EntityStore<E>,
        scope: E::Scope,
        request: F,
    ) -> DomainResponse<Option<E>>
    where
        E: FromWire,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = provider_spotify::Result<E::Data>> + Send,
    {
        let outcome = self.load_or_fetch_one(store, scope, request).await;
        self.respond(domain, outcome)
    }

    async fn load_or_fetch<E, F, Fut>(
        &self,
        domain: &'static str,
        store: &EntityStore<E>,
        scope: E::Scope,
        request: F,
    ) -> Result<Vec<E>>
    where
        E: FromWire,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = provider_spotify::Result<Vec<E::Data>>> + Send,
    {
        {
            let cached = store.scoped(scope.clone()).await;
            if cached.count().await? > 0 {
                debug!(domain, scope = ?scope, "Serving from cache");
                return Ok(cached.list().await?);
            }
        }

        debug!(domain, scope = ?scope, "Cache miss, fetching");
        let items = request().await?;
        self.replace(domain, store, scope, &items).await
    }

    async fn load_or_fetch_one<E, F, Fut>(
        &self,
        store: &EntityStore<E>,
        scope: E::Scope,
        request: F,
    ) -> Result<Option<E>>
    where
        E: FromWire,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = provider_spotify::Result<E::Data>> + Send,
    {
        {
            let cached = store.scoped(scope.clone()).await;
            if cached.count().await? > 0 {
                return Ok(Some(cached.read(0).await?));
            }
        }

        let data = request().await?;
        let mut scoped = store.scoped(scope).await;
        Ok(Some(scoped.create(&data).await?))
    }

    /// Erase-then-create under one held scope, committed as one write.
    pub(crate) async fn replace<E: FromWire>(
        &self,
        domain: &'static str,
        store: &EntityStore<E>,
        scope: E::Scope,
        items: &[E::Data],
    ) -> Result<Vec<E>> {
        let mut scoped = store.scoped(scope).await;
        let removed = scoped.count().await?;
        scoped.replace_all(items).await?;
        let rows = scoped.list().await?;

        info!(domain, removed, count = rows.len(), "Replaced cached scope");
        self.emit(CacheEvent::Refreshed {
            domain: domain.to_string(),
            count: rows.len(),
        });
        Ok(rows)
    }

    /// Folds an outcome into the response shape, reporting failures on the
    /// event bus.
    pub(crate) fn respond<T: Default>(
        &self,
        domain: &'static str,
        outcome: Result<T>,
    ) -> DomainResponse<T> {
        match outcome {
            Ok(result) => DomainResponse::ok(result),
            Err(err) => {
                if err.is_contract_violation() {
                    error!(domain, error = %err, "Store contract violated");
                } else {
                    warn!(domain, error = %err, "Fetch failed");
                }
                let message = err.user_message();
                self.emit(CacheEvent::FetchFailed {
                    domain: domain.to_string(),
                    message: message.clone(),
                });
                DomainResponse::error(message)
            }
        }
    }

    fn emit(&self, event: CacheEvent) {
        let _ = self.events.emit(CoreEvent::Cache(event));
    }
}
