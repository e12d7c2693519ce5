//! Paper index synchronization between the store and the local cache.
//!
//! State moves `Idle -> Loading -> Ready | Error`. Activation serves a
//! non-empty cached index without touching the network; a refresh always
//! rebuilds the index from the store and resolves every URL concurrently.

use crate::cache::LocalCache;
use crate::constants::REFRESH_ERROR_MESSAGE;
use crate::error::AppError;
use crate::filter::filter_papers;
use crate::models::{Paper, SearchFilters};
use crate::store::PaperStore;
use futures::future::try_join_all;
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle of the published index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Loading,
    Ready,
    /// Refresh failed; carries the user-facing message.
    Error(String),
}

/// What the shell renders: current state and the published papers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSnapshot {
    pub state: SyncState,
    /// `None` until the first activation publishes something.
    pub papers: Option<Vec<Paper>>,
}

impl IndexSnapshot {
    fn idle() -> Self {
        Self {
            state: SyncState::Idle,
            papers: None,
        }
    }

    /// Error message when the last refresh failed.
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            SyncState::Error(message) => Some(message.as_str()),
            _ => None,
        }
    }
}

/// Orchestrates store discovery, URL resolution and caching.
pub struct IndexSync {
    store: Arc<dyn PaperStore>,
    cache: LocalCache,
    tx: watch::Sender<IndexSnapshot>,
}

impl IndexSync {
    pub fn new(store: Arc<dyn PaperStore>, cache: LocalCache) -> Self {
        let (tx, _rx) = watch::channel(IndexSnapshot::idle());
        Self { store, cache, tx }
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<IndexSnapshot> {
        self.tx.subscribe()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> IndexSnapshot {
        self.tx.borrow().clone()
    }

    fn publish(&self, state: SyncState, papers: Option<Vec<Paper>>) {
        self.tx.send_replace(IndexSnapshot { state, papers });
    }

    /// Load the index, preferring a non-empty cached copy.
    ///
    /// Calling this again re-reads the cache, which is how a locally appended
    /// upload becomes visible without a refresh.
    pub async fn activate(&self) -> IndexSnapshot {
        match self.cache.get() {
            Some(cached) if !cached.is_empty() => {
                tracing::debug!(count = cached.len(), "serving paper index from cache");
                self.publish(SyncState::Ready, Some(cached));
                self.snapshot()
            }
            _ => self.refresh().await,
        }
    }

    /// Rebuild the index from the store, ignoring the cache.
    ///
    /// Any failure, including a single unresolved URL, publishes an empty list
    /// with [`SyncState::Error`]; stale data is never kept.
    pub async fn refresh(&self) -> IndexSnapshot {
        let previous = self.tx.borrow().papers.clone();
        self.publish(SyncState::Loading, previous);

        match self.fetch_resolved().await {
            Ok(papers) => {
                self.cache.set(&papers);
                tracing::info!(count = papers.len(), "paper index refreshed");
                self.publish(SyncState::Ready, Some(papers));
            }
            Err(err) => {
                tracing::error!("Failed to fetch papers from the store: {}", err);
                self.publish(
                    SyncState::Error(REFRESH_ERROR_MESSAGE.to_string()),
                    Some(Vec::new()),
                );
            }
        }
        self.snapshot()
    }

    async fn fetch_resolved(&self) -> Result<Vec<Paper>, AppError> {
        let discovered = self.store.list_all_papers().await?;
        let store = &self.store;
        try_join_all(discovered.into_iter().map(|paper| async move {
            let url = store.get_paper_url(&paper.path).await?;
            Ok::<_, AppError>(paper.with_url(url))
        }))
        .await
    }

    /// Published papers narrowed by `filters`; empty when nothing is published.
    pub fn visible(&self, filters: &SearchFilters) -> Vec<Paper> {
        match self.tx.borrow().papers.as_deref() {
            Some(papers) => filter_papers(papers, filters),
            None => Vec::new(),
        }
    }

    /// Find a published paper by id.
    pub fn find(&self, id: &str) -> Option<Paper> {
        self.tx
            .borrow()
            .papers
            .as_deref()?
            .iter()
            .find(|paper| paper.id == id)
            .cloned()
    }
}
