//! Keeps the dashboard search text, the app location and the directory list
//! in step.
//!
//! Text and location change together, synchronously, on every keystroke.
//! The network fetch trails behind a debounce window, and a response that
//! is no longer the newest one issued is dropped instead of applied.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::{sync::watch, task::JoinHandle};

use crate::{
    api::DirectoryApi,
    error::Result,
    store::{ListKey, SharedStore},
};

pub mod debounce;
pub mod location;

pub use debounce::{Debouncer, RequestSequence, Ticket};
pub use location::{Location, SEARCH_PARAM};

#[derive(Debug, Default)]
struct QueryState {
    text: String,
    location: Location,
}

struct Fetcher {
    api: Arc<dyn DirectoryApi>,
    store: SharedStore,
    sequence: RequestSequence,
    applied: watch::Sender<u64>,
}

impl Fetcher {
    /// Fetch all members for blank text, search results otherwise, and apply
    /// them to the directory list if no newer request went out meanwhile.
    async fn fetch(&self, text: &str) -> Result<()> {
        let ticket = self.sequence.issue();
        let query = text.trim();
        // A dropped stale response leaves `loading` set. The request that
        // superseded it holds a newer ticket and always finishes or fails
        // the load, which clears it.
        let sent = self.store.write().await.begin_load(&ListKey::Directory);

        let result = if query.is_empty() {
            self.api.list_members().await
        } else {
            self.api.search_members(query).await
        };

        let mut store = self.store.write().await;
        if !self.sequence.is_latest(ticket) {
            tracing::debug!("Discarding stale results for {:?}", query);
            return Ok(());
        }

        let outcome = match result {
            Ok(members) => {
                tracing::debug!("Directory now shows {} members for {:?}", members.len(), query);
                store.finish_load(&ListKey::Directory, members, sent);
                Ok(())
            }
            Err(e) => {
                store.fail_load(&ListKey::Directory, e.clone());
                Err(e)
            }
        };
        drop(store);

        self.applied.send_modify(|count| *count += 1);
        outcome
    }
}

/// A scheduled search, still inside or past its debounce window.
#[derive(Debug)]
pub struct PendingSearch(JoinHandle<bool>);

impl PendingSearch {
    /// Wait until the search has been sent and applied, or superseded.
    /// Returns `true` when it was sent.
    pub async fn finished(self) -> bool {
        self.0.await.unwrap_or(false)
    }
}

pub struct QuerySynchronizer {
    fetcher: Arc<Fetcher>,
    state: Mutex<QueryState>,
    debouncer: Debouncer,
}

impl QuerySynchronizer {
    pub fn new(api: Arc<dyn DirectoryApi>, store: SharedStore, debounce: Duration) -> Self {
        let (applied, _) = watch::channel(0);
        Self {
            fetcher: Arc::new(Fetcher {
                api,
                store,
                sequence: RequestSequence::new(),
                applied,
            }),
            state: Mutex::new(QueryState::default()),
            debouncer: Debouncer::new(debounce),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn text(&self) -> String {
        self.state().text.clone()
    }

    pub fn location(&self) -> String {
        self.state().location.to_string()
    }

    /// Ticks once per applied response, successful or not.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.fetcher.applied.subscribe()
    }

    /// Adopt the search text carried by `location` and fetch for it right
    /// away, without waiting out the debounce window.
    pub async fn initialize(&self, location: &str) -> Result<()> {
        self.debouncer.cancel();
        let location = Location::parse(location);
        let text = location.search().to_string();
        {
            let mut state = self.state();
            state.text = text.clone();
            state.location = location;
        }
        self.fetcher.fetch(&text).await
    }

    /// Record new search text. The location follows immediately; the fetch
    /// waits until the text has been quiet for the debounce window.
    pub fn set_query(&self, text: impl Into<String>) -> PendingSearch {
        let text = text.into();
        {
            let mut state = self.state();
            state.location = state.location.with_search(&text);
            state.text = text.clone();
        }

        let fetcher = self.fetcher.clone();
        PendingSearch(self.debouncer.schedule(async move {
            if let Err(e) = fetcher.fetch(&text).await {
                tracing::warn!("Search for {:?} failed: {}", text, e);
            }
        }))
    }

    /// Fetch again for the current text, skipping the debounce window.
    pub async fn refresh(&self) -> Result<()> {
        self.debouncer.cancel();
        let text = self.text();
        self.fetcher.fetch(&text).await
    }
}
