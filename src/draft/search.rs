//! Debounced catalog search with stale-response suppression.
//!
//! Every keystroke takes a ticket from a monotonic sequencer. A search fires
//! only after the debounce window passes without a newer keystroke, and its
//! results are applied only if no newer search started while it was in
//! flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::catalog::CatalogProvider;
use super::error::DraftError;
use crate::models::{CatalogEntry, CatalogFilters, CatalogKind};

/// Position of one query in the keystroke sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SearchTicket(u64);

#[derive(Debug, Default)]
pub struct SearchSequencer {
    latest: AtomicU64,
}

impl SearchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> SearchTicket {
        SearchTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, ticket: SearchTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Results were stored as the current result list.
    Applied(Vec<CatalogEntry>),
    /// A newer keystroke arrived inside the window; no request was sent.
    Debounced,
    /// A newer search started while this one was in flight; results dropped.
    Stale,
}

#[derive(Debug, Default)]
struct SearchState {
    query: String,
    results: Vec<CatalogEntry>,
}

pub struct DebouncedSearch {
    catalog: Arc<CatalogProvider>,
    kind: CatalogKind,
    window: Duration,
    filters: Mutex<CatalogFilters>,
    sequencer: SearchSequencer,
    state: Mutex<SearchState>,
}

impl DebouncedSearch {
    pub fn new(catalog: Arc<CatalogProvider>, kind: CatalogKind, window: Duration) -> Self {
        Self {
            catalog,
            kind,
            window,
            filters: Mutex::new(CatalogFilters::default()),
            sequencer: SearchSequencer::new(),
            state: Mutex::new(SearchState::default()),
        }
    }

    pub fn kind(&self) -> CatalogKind {
        self.kind
    }

    pub fn set_filters(&self, filters: CatalogFilters) -> Result<(), DraftError> {
        *self.filters.lock().map_err(|_| DraftError::LockPoisoned)? = filters;
        Ok(())
    }

    /// Handle one keystroke. Resolves after the window and, if the query is
    /// still current, after the search returns.
    pub async fn on_input(&self, query: &str) -> Result<SearchOutcome, DraftError> {
        let ticket = self.sequencer.issue();
        tokio::time::sleep(self.window).await;
        if !self.sequencer.is_latest(ticket) {
            return Ok(SearchOutcome::Debounced);
        }

        let filters = self.filters.lock().map_err(|_| DraftError::LockPoisoned)?.clone();
        let found = self.catalog.search(self.kind, query, &filters).await;

        if !self.sequencer.is_latest(ticket) {
            tracing::debug!(kind = self.kind.as_str(), query, "Discarding stale search response");
            return Ok(SearchOutcome::Stale);
        }
        let mut state = self.state.lock().map_err(|_| DraftError::LockPoisoned)?;
        state.query = query.trim().to_string();
        state.results = found.clone();
        Ok(SearchOutcome::Applied(found))
    }

    /// Invalidate pending and in-flight searches, e.g. when the picker closes.
    pub fn cancel(&self) -> Result<(), DraftError> {
        self.sequencer.issue();
        *self.state.lock().map_err(|_| DraftError::LockPoisoned)? = SearchState::default();
        Ok(())
    }

    pub fn results(&self) -> Result<Vec<CatalogEntry>, DraftError> {
        Ok(self
            .state
            .lock()
            .map_err(|_| DraftError::LockPoisoned)?
            .results
            .clone())
    }

    /// Query that produced the current results.
    pub fn applied_query(&self) -> Result<String, DraftError> {
        Ok(self
            .state
            .lock()
            .map_err(|_| DraftError::LockPoisoned)?
            .query
            .clone())
    }
}
