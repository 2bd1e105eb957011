use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

use super::{BridgeSearch, SearchResult};
use crate::dydx::GatewayError;

/// What the presentation side shows for the current search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    NotSearched,
    Pending { address: String },
    /// Holds an empty result when the address has no delayed events.
    Completed(SearchResult),
    Failed { address: String, error: GatewayError },
}

/// Identifies one started search. Only the ticket of the most recently
/// started search can still publish its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

struct SessionInner {
    generation: u64,
    state: SearchState,
}

/// Search state of one user session.
///
/// Searches cannot be cancelled, so an older search may finish after a newer
/// one was started. The newest started search wins: outcomes of superseded
/// searches are dropped whatever order they complete in.
pub struct SearchSession {
    inner: Mutex<SessionInner>,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchSession {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                generation: 0,
                state: SearchState::NotSearched,
            }),
        }
    }

    pub fn state(&self) -> SearchState {
        self.lock().state.clone()
    }

    pub fn begin(&self, address: &str) -> SearchTicket {
        let mut inner = self.lock();
        inner.generation = inner.generation.wrapping_add(1);
        inner.state = SearchState::Pending {
            address: address.to_string(),
        };
        SearchTicket(inner.generation)
    }

    /// Publishes the outcome of the search behind `ticket` and returns the
    /// new state. Returns `None` if a newer search was started or the session
    /// was reset meanwhile.
    pub fn complete(
        &self,
        ticket: SearchTicket,
        address: &str,
        outcome: Result<SearchResult, GatewayError>,
    ) -> Option<SearchState> {
        let mut inner = self.lock();
        if inner.generation != ticket.0 {
            debug!(
                "Dropping outcome of superseded search for {} (ticket {}, current {})",
                address, ticket.0, inner.generation
            );
            return None;
        }

        inner.state = match outcome {
            Ok(result) => SearchState::Completed(result),
            Err(error) => SearchState::Failed {
                address: address.to_string(),
                error,
            },
        };
        Some(inner.state.clone())
    }

    /// Back to `NotSearched`. Searches still in flight are discarded.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation = inner.generation.wrapping_add(1);
        inner.state = SearchState::NotSearched;
    }

    /// Runs the search behind `ticket`, taken earlier from `begin`, and
    /// publishes it. Returns the new state, or `None` when the search was
    /// superseded before it finished.
    pub async fn run(
        &self,
        ticket: SearchTicket,
        search: &BridgeSearch,
        address: &str,
    ) -> Option<SearchState> {
        info!("Searching delayed bridge events for {}", address);
        let outcome = search.search(address).await;
        self.complete(ticket, address, outcome)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
