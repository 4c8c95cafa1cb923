//! Catalog search.
//!
//! Results are transient: nothing is written to the stores and no change
//! notification fires. The latest query wins; starting a search cancels
//! the one still in flight.

use crate::context::CatalogContext;
use crate::{DomainResponse, SyncError};
use core_library::wire::{Paging, SearchItem, SearchResponse};
use core_library::{SearchKind, SearchResult};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// How a search call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Results(DomainResponse<Vec<SearchResult>>),
    /// A newer search started before this one finished
    Superseded,
}

impl SearchOutcome {
    /// Results, or `None` when superseded.
    pub fn into_response(self) -> Option<DomainResponse<Vec<SearchResult>>> {
        match self {
            SearchOutcome::Results(response) => Some(response),
            SearchOutcome::Superseded => None,
        }
    }
}

pub struct SearchCoordinator {
    context: CatalogContext,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl SearchCoordinator {
    pub fn new(context: CatalogContext) -> Self {
        Self {
            context,
            in_flight: Mutex::new(None),
        }
    }

    /// Searches albums, artists and playlists. A blank query clears the
    /// results without a request.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> SearchOutcome {
        let token = CancellationToken::new();
        if let Some(previous) = self.in_flight.lock().await.replace(token.clone()) {
            previous.cancel();
        }

        let query = query.trim();
        if query.is_empty() {
            return SearchOutcome::Results(DomainResponse::ok(Vec::new()));
        }

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Search superseded");
                return SearchOutcome::Superseded;
            }
            response = self.context.api().search(query) => response,
        };

        if token.is_cancelled() {
            return SearchOutcome::Superseded;
        }

        let outcome = response.map(|body| merge(&body)).map_err(SyncError::from);
        SearchOutcome::Results(self.context.respond("search", outcome))
    }

    /// Cancels the running search, if any.
    pub async fn cancel(&self) {
        if let Some(token) = self.in_flight.lock().await.take() {
            token.cancel();
        }
    }

    /// Thumbnail of a search result. Never cached.
    pub async fn search_cover_image(&self, url: Option<&str>) -> DomainResponse<Vec<u8>> {
        let outcome = match url.filter(|url| !url.is_empty()) {
            Some(url) => self
                .context
                .api()
                .download(url)
                .await
                .map(|bytes| bytes.to_vec())
                .map_err(SyncError::from),
            None => Err(SyncError::Unavailable("image")),
        };
        self.context.respond("search.image", outcome)
    }
}

/// Flattens the three result lists, sorted case-insensitively by name.
fn merge(response: &SearchResponse) -> Vec<SearchResult> {
    let sections: [(&Option<Paging<SearchItem>>, SearchKind); 3] = [
        (&response.albums, SearchKind::Album),
        (&response.artists, SearchKind::Artist),
        (&response.playlists, SearchKind::Playlist),
    ];

    let mut results: Vec<SearchResult> = sections
        .into_iter()
        .filter_map(|(paging, kind)| paging.as_ref().map(|paging| (paging, kind)))
        .flat_map(|(paging, kind)| {
            paging
                .items
                .iter()
                .map(move |item| SearchResult::from_item(item, kind))
        })
        .collect();
    results.sort_by_cached_key(|result| result.name.to_lowercase());
    results
}
