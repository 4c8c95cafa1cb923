//! Category browsing.

use crate::context::CatalogContext;
use crate::DomainResponse;
use core_library::{Category, CategoryScope, Playlist, PlaylistScope};

#[derive(Clone)]
pub struct BrowseCoordinator {
    context: CatalogContext,
}

impl BrowseCoordinator {
    pub fn new(context: CatalogContext) -> Self {
        Self { context }
    }

    pub async fn fetch_categories(&self) -> DomainResponse<Vec<Category>> {
        let api = self.context.api();
        self.context
            .fetch(
                "browse.categories",
                &self.context.stores().categories,
                CategoryScope::All,
                || api.categories(),
            )
            .await
    }

    pub async fn refresh_categories(&self) -> DomainResponse<Vec<Category>> {
        let api = self.context.api();
        self.context
            .refresh(
                "browse.categories",
                &self.context.stores().categories,
                CategoryScope::All,
                || api.categories(),
            )
            .await
    }

    pub async fn category(&self, id: &str) -> DomainResponse<Option<Category>> {
        let api = self.context.api();
        self.context
            .fetch_one(
                "browse.category",
                &self.context.stores().categories,
                CategoryScope::Id(id.to_string()),
                || api.category(id),
            )
            .await
    }

    /// Playlists listed under one category. They live in the category's
    /// partition, apart from any session-tagged copy.
    pub async fn fetch_category_playlists(&self, id: &str) -> DomainResponse<Vec<Playlist>> {
        let api = self.context.api();
        self.context
            .fetch(
                "browse.category_playlists",
                &self.context.stores().playlists,
                PlaylistScope::Category(id.to_string()),
                || api.category_playlists(id),
            )
            .await
    }

    pub async fn refresh_category_playlists(&self, id: &str) -> DomainResponse<Vec<Playlist>> {
        let api = self.context.api();
        self.context
            .refresh(
                "browse.category_playlists",
                &self.context.stores().playlists,
                PlaylistScope::Category(id.to_string()),
                || api.category_playlists(id),
            )
            .await
    }
}
