//! Search orchestration - Free text in, matching products out.
//!
//! One search runs these steps strictly in order:
//!
//! 1. Reject blank text with [`Error::InvalidQuery`] before touching any backend.
//! 2. Extract a [`SearchPreference`]; on any failure continue with an empty one.
//! 3. Build a [`CatalogFilter`] from roast level, acidity and origin.
//! 4. List matching products, newest first. A failure here fails the search.
//! 5. Dispatch the query log write as a best-effort side effect.
//! 6. Return the products and their count.
//!
//! Flavor notes and other preferences are extracted and logged but do not
//! constrain the listing.

use crate::{
    core::{
        best_effort::{BestEffort, EffectHandle},
        preference::{PreferenceExtractor, SearchPreference},
        product::{CatalogFilter, list_products},
        query_log::append_query,
    },
    entities::product,
    errors::{Degradation, Error, Result},
    services::llm::CompletionBackend,
};
use sea_orm::DatabaseConnection;
use std::time::Duration;
use tracing::{info, instrument};

/// What a completed search hands back.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Matching products, newest first
    pub results: Vec<product::Model>,
    /// Always `results.len()`
    pub result_count: usize,
    /// The preference record the filter was built from
    pub preference: SearchPreference,
    /// The dispatched query log write
    pub query_log: EffectHandle,
}

/// Builds the catalog filter from the non-empty filterable fields.
#[must_use]
pub fn build_catalog_filter(preference: &SearchPreference) -> CatalogFilter {
    let non_empty = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
    };
    CatalogFilter {
        roast_level: non_empty(&preference.roast_level),
        acidity: non_empty(&preference.acidity),
        origin: non_empty(&preference.origin),
        merchant_id: None,
    }
}

/// Composes preference extraction, catalog listing and query logging.
#[derive(Debug)]
pub struct SearchOrchestrator<B> {
    db: DatabaseConnection,
    extractor: PreferenceExtractor<B>,
    effects: BestEffort,
    catalog_deadline: Duration,
}

impl<B: CompletionBackend> SearchOrchestrator<B> {
    /// Creates an orchestrator; `catalog_deadline` bounds the listing query.
    #[must_use]
    pub const fn new(
        db: DatabaseConnection,
        extractor: PreferenceExtractor<B>,
        effects: BestEffort,
        catalog_deadline: Duration,
    ) -> Self {
        Self {
            db,
            extractor,
            effects,
            catalog_deadline,
        }
    }

    /// Runs one search.
    ///
    /// # Errors
    /// Returns [`Error::InvalidQuery`] for blank text, or a persistence error
    /// ([`Error::Database`], [`Error::Timeout`]) if the catalog query fails.
    /// Extraction and logging failures never surface here.
    #[instrument(skip(self))]
    pub async fn perform_search(&self, raw_query_text: &str) -> Result<SearchOutcome> {
        if raw_query_text.trim().is_empty() {
            return Err(Error::InvalidQuery);
        }

        let preference = self.extractor.extract(raw_query_text).await;
        let filter = build_catalog_filter(&preference);

        let results = tokio::time::timeout(self.catalog_deadline, list_products(&self.db, &filter))
            .await
            .map_err(|_| Error::Timeout {
                operation: "catalog query",
            })??;
        let result_count = results.len();

        let db = self.db.clone();
        let logged_text = raw_query_text.to_string();
        let snapshot = preference.clone();
        let query_log = self.effects.spawn(Degradation::LoggingFailure, async move {
            append_query(&db, &logged_text, &snapshot, result_count)
                .await
                .map(|_| ())
        });

        info!(result_count, filtered = !filter.is_unconstrained(), "Search completed");
        Ok(SearchOutcome {
            results,
            result_count,
            preference,
            query_log,
        })
    }
}
