//! Web search query suggestion.
//!
//! Turns a preference record into a short query for finding coffees outside
//! the catalog. When the model is unavailable the query is assembled from
//! the origin, roast and acidity that were extracted.

use crate::{
    config::settings::LanguageModelSettings,
    core::{best_effort::Observer, preference::SearchPreference},
    errors::{Degradation, Error, Result},
    services::llm::{CompletionBackend, CompletionRequest},
};
use std::sync::Arc;
use std::time::Duration;

const SUGGESTION_INSTRUCTION: &str = "You are a search query optimization assistant. Generate a \
concise web search query for finding coffee products that match the provided preferences.";

/// Query used when nothing at all was extracted
pub const GENERIC_QUERY: &str = "specialty coffee beans";

fn or_any<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.filter(|v| !v.is_empty()).unwrap_or(fallback)
}

fn render_prompt(preference: &SearchPreference) -> String {
    let notes = if preference.flavor_notes.is_empty() {
        "any".to_string()
    } else {
        preference.flavor_notes.join(", ")
    };
    let other = if preference.other_preferences.trim().is_empty() {
        "none"
    } else {
        preference.other_preferences.as_str()
    };
    format!(
        "Create a search query for coffee with these preferences:\nRoast Level: {}\nAcidity: {}\nOrigin: {}\nFlavor Notes: {notes}\nOther: {other}",
        or_any(preference.roast_level.as_deref(), "any"),
        or_any(preference.acidity.as_deref(), "any"),
        or_any(preference.origin.as_deref(), "any"),
    )
}

/// Builds a query locally from origin, roast and acidity.
#[must_use]
pub fn fallback_query(preference: &SearchPreference) -> String {
    let mut parts = Vec::new();
    if let Some(origin) = &preference.origin {
        parts.push(origin.clone());
    }
    if let Some(roast) = &preference.roast_level {
        parts.push(format!("{roast} roast"));
    }
    if let Some(acidity) = &preference.acidity {
        parts.push(format!("{acidity} acidity"));
    }

    if parts.is_empty() {
        GENERIC_QUERY.to_string()
    } else {
        format!("{} coffee beans", parts.join(" "))
    }
}

/// Wraps the language-model call that suggests web search queries.
#[derive(Debug)]
pub struct SearchQuerySuggester<B> {
    backend: Arc<B>,
    temperature: f32,
    max_tokens: u32,
    deadline: Duration,
    observer: Observer,
}

impl<B: CompletionBackend> SearchQuerySuggester<B> {
    /// Creates a suggester; `deadline` bounds each call.
    #[must_use]
    pub fn new(
        backend: Arc<B>,
        settings: &LanguageModelSettings,
        deadline: Duration,
        observer: Observer,
    ) -> Self {
        Self {
            backend,
            temperature: settings.search_query_temperature,
            max_tokens: settings.search_query_max_tokens,
            deadline,
            observer,
        }
    }

    async fn try_suggest(&self, preference: &SearchPreference) -> Result<String> {
        let request = CompletionRequest {
            system: SUGGESTION_INSTRUCTION.to_string(),
            user: render_prompt(preference),
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            json_output: false,
        };
        let text = tokio::time::timeout(self.deadline, self.backend.complete(request))
            .await
            .map_err(|_| Error::Timeout {
                operation: "search query suggestion",
            })??;
        let text = text.trim().trim_matches('"').trim();
        if text.is_empty() {
            return Err(Error::LanguageModel {
                message: "empty search query".to_string(),
            });
        }
        Ok(text.to_string())
    }

    /// Suggests a web search query, falling back to [`fallback_query`].
    pub async fn suggest(&self, preference: &SearchPreference) -> String {
        match self.try_suggest(preference).await {
            Ok(query) => query,
            Err(e) => {
                self.observer.report(Degradation::SuggestionDegraded, &e);
                fallback_query(preference)
            }
        }
    }
}
