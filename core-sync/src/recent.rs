use crate::context::{CatalogContext, RECENT};
use crate::DomainResponse;
use core_library::{Track, TrackScope};

/// Tracks from the player history.
#[derive(Clone)]
pub struct RecentCoordinator {
    context: CatalogContext,
}

impl RecentCoordinator {
    pub fn new(context: CatalogContext) -> Self {
        Self { context }
    }

    pub async fn fetch_recently_played(&self) -> DomainResponse<Vec<Track>> {
        let api = self.context.api();
        self.context
            .fetch(
                "recent.tracks",
                &self.context.stores().tracks,
                TrackScope::Session(RECENT.to_string()),
                || api.recently_played(),
            )
            .await
    }

    pub async fn refresh_recently_played(&self) -> DomainResponse<Vec<Track>> {
        let api = self.context.api();
        self.context
            .refresh(
                "recent.tracks",
                &self.context.stores().tracks,
                TrackScope::Session(RECENT.to_string()),
                || api.recently_played(),
            )
            .await
    }
}
