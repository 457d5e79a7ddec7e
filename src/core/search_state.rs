//! Search view state machine.
//!
//! `Idle -> Loading -> Results(n)` on success, `Loading -> Idle` plus an
//! error signal on failure. `Results` with zero products is a real outcome,
//! distinct from `Idle` (nothing searched yet). Submitting again from any
//! state goes back to `Loading`.
//!
//! Searches cannot be cancelled. If two are in flight, whichever completes
//! last decides what is shown.

use crate::{
    core::search::SearchOrchestrator,
    entities::product,
    errors::{Error, Result},
    services::llm::CompletionBackend,
};

/// What the search view is showing.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SearchState {
    /// Nothing searched yet, or the last search failed
    #[default]
    Idle,
    /// A search is in flight
    Loading,
    /// A search finished; possibly with no products
    Results(Vec<product::Model>),
}

/// Search view model: current state plus a one-shot error message.
#[derive(Debug, Clone, Default)]
pub struct SearchView {
    state: SearchState,
    error: Option<String>,
}

impl SearchView {
    /// A view in the `Idle` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &SearchState {
        &self.state
    }

    /// Takes the pending error message, if any.
    pub fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }

    /// Enters `Loading`, from any state.
    pub fn submit(&mut self) {
        self.state = SearchState::Loading;
        self.error = None;
    }

    /// Applies the outcome of a search.
    pub fn complete(&mut self, outcome: Result<Vec<product::Model>>) {
        match outcome {
            Ok(results) => self.state = SearchState::Results(results),
            Err(e) => {
                self.state = SearchState::Idle;
                self.error = Some(e.user_message());
            }
        }
    }

    /// Submits `text` through `orchestrator` and applies the outcome.
    ///
    /// Blank text only raises the error signal; the current state is kept,
    /// since nothing was submitted.
    pub async fn run<B: CompletionBackend>(
        &mut self,
        orchestrator: &SearchOrchestrator<B>,
        text: &str,
    ) {
        if text.trim().is_empty() {
            self.error = Some(Error::InvalidQuery.user_message());
            return;
        }
        self.submit();
        let outcome = orchestrator
            .perform_search(text)
            .await
            .map(|outcome| outcome.results);
        self.complete(outcome);
    }
}
