//! Core service façade and bootstrap.
//!
//! Wires the host bridges from a [`ClientConfig`] into the shared core:
//! the database pool and one store per entity type, the event bus, the
//! session manager, the catalog fetcher and every domain coordinator.
//! Desktop hosts keep the default `desktop-shims` feature so missing
//! bridges fall back to `reqwest` and the OS keychain.
//!
//! ```ignore
//! use core_runtime::ClientConfig;
//! use core_service::CoreService;
//!
//! let core = CoreService::bootstrap(
//!     ClientConfig::builder()
//!         .client_credentials("my-client-id", "my-client-secret")
//!         .build()?,
//! )
//! .await?;
//!
//! if !core.is_authenticated().await {
//!     open_browser(&core.authorize_url().await?);
//! }
//! let albums = core.library().fetch_saved_albums().await;
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use core_auth::SessionManager;
use core_library::{create_pool, DatabaseConfig, Stores};
use core_runtime::events::{EventBus, EventStream};
use core_runtime::ClientConfig;
use core_sync::{
    ArtworkCoordinator, BrowseCoordinator, CatalogContext, HomeCoordinator, LibraryCoordinator,
    RecentCoordinator, SearchCoordinator, TracksCoordinator,
};
use provider_spotify::{CatalogApi, SpotifyConnector};
use tracing::{info, instrument, warn};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    session: Arc<SessionManager>,
    stores: Stores,
    events: EventBus,
    home: HomeCoordinator,
    library: LibraryCoordinator,
    browse: BrowseCoordinator,
    tracks: TracksCoordinator,
    recent: RecentCoordinator,
    artwork: ArtworkCoordinator,
    search: Arc<SearchCoordinator>,
}

impl CoreService {
    /// Build the whole core from `config`.
    ///
    /// Persisted tokens are restored so a returning user skips the login
    /// screen. A secure store that cannot be read leaves the session signed
    /// out instead of failing startup.
    #[instrument(skip(config), fields(database = %config.database_url))]
    pub async fn bootstrap(config: ClientConfig) -> Result<Self> {
        let pool = create_pool(DatabaseConfig::from_url(&config.database_url)).await?;
        let stores = Stores::new(pool);
        let events = EventBus::new(config.event_buffer_size);

        let session = Arc::new(SessionManager::from_config(&config, events.clone()));
        match session.restore().await {
            Ok(restored) => info!(restored, "Session restored"),
            Err(e) => warn!(error = %e, "Could not read persisted session"),
        }

        let connector = SpotifyConnector::from_config(&config, Arc::clone(&session))?;
        Ok(Self::assemble(session, Arc::new(connector), stores, events))
    }

    /// Assemble the service around an existing session and catalog.
    pub fn assemble(
        session: Arc<SessionManager>,
        api: Arc<dyn CatalogApi>,
        stores: Stores,
        events: EventBus,
    ) -> Self {
        let context = CatalogContext::new(api, stores.clone(), events.clone());
        Self {
            session,
            stores,
            events,
            home: HomeCoordinator::new(context.clone()),
            library: LibraryCoordinator::new(context.clone()),
            browse: BrowseCoordinator::new(context.clone()),
            tracks: TracksCoordinator::new(context.clone()),
            recent: RecentCoordinator::new(context.clone()),
            artwork: ArtworkCoordinator::new(context.clone()),
            search: Arc::new(SearchCoordinator::new(context)),
        }
    }

    /// URL of the authorization page to open in a browser.
    pub async fn authorize_url(&self) -> Result<String> {
        Ok(self.session.authorize_url().await?)
    }

    /// Complete sign-in from the redirect the browser was sent to.
    pub async fn handle_callback(&self, callback_url: &str) -> Result<()> {
        Ok(self.session.handle_callback(callback_url).await?)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.is_authenticated().await
    }

    /// Sign out and forget the persisted tokens. Cached catalog rows stay.
    pub async fn logout(&self) -> Result<()> {
        Ok(self.session.logout().await?)
    }

    /// Auth and cache events, e.g. to route back to login after a failed
    /// refresh.
    pub fn events(&self) -> EventStream {
        self.events.stream()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Entity stores, for observer subscription.
    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn home(&self) -> &HomeCoordinator {
        &self.home
    }

    pub fn library(&self) -> &LibraryCoordinator {
        &self.library
    }

    pub fn browse(&self) -> &BrowseCoordinator {
        &self.browse
    }

    pub fn tracks(&self) -> &TracksCoordinator {
        &self.tracks
    }

    pub fn recent(&self) -> &RecentCoordinator {
        &self.recent
    }

    pub fn artwork(&self) -> &ArtworkCoordinator {
        &self.artwork
    }

    pub fn search(&self) -> &SearchCoordinator {
        &self.search
    }
}
