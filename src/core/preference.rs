//! Preference extraction - Turns free text into a structured preference record.
//!
//! The language model is asked for a JSON object with `roastLevel`, `acidity`,
//! `origin`, `flavorNotes` and `otherPreferences`. Missing, `null` and blank
//! fields all read as "not mentioned". Values are not checked against the
//! product enums; an unknown roast level just matches no product.
//!
//! Extraction fails open: if the call errors, times out, or returns something
//! that does not parse, the result is an empty record and search carries on
//! unfiltered.

use crate::{
    config::settings::LanguageModelSettings,
    core::best_effort::Observer,
    errors::{Degradation, Error, Result},
    services::llm::{CompletionBackend, CompletionRequest},
};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const EXTRACTION_INSTRUCTION: &str = "You are a coffee expert assistant. Extract structured \
coffee preferences from the user's message. Respond with ONLY a JSON object containing these \
fields, left empty when the user does not mention them:\n\
- roastLevel: light, medium, dark, or empty\n\
- acidity: low, medium, high, or empty\n\
- origin: country or region name, or empty\n\
- flavorNotes: array of flavor notes, or an empty array\n\
- otherPreferences: any other relevant preference, or empty";

/// Structured preferences derived from one search query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchPreference {
    /// Requested roast level
    #[serde(deserialize_with = "blank_as_none")]
    pub roast_level: Option<String>,
    /// Requested acidity
    #[serde(deserialize_with = "blank_as_none")]
    pub acidity: Option<String>,
    /// Requested origin, matched as a substring
    #[serde(deserialize_with = "blank_as_none")]
    pub origin: Option<String>,
    /// Flavor notes; informational only, not used for filtering
    #[serde(deserialize_with = "null_as_default")]
    pub flavor_notes: Vec<String>,
    /// Anything else the user asked for; informational only
    #[serde(deserialize_with = "null_as_default")]
    pub other_preferences: String,
}

impl SearchPreference {
    /// Whether no field carries a preference.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roast_level.is_none()
            && self.acidity.is_none()
            && self.origin.is_none()
            && self.flavor_notes.is_empty()
            && self.other_preferences.trim().is_empty()
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parses the model's JSON reply into a preference record.
///
/// # Errors
/// Returns [`Error::LanguageModel`] if the reply is not a JSON object of the expected shape.
pub fn parse_preference(reply: &str) -> Result<SearchPreference> {
    serde_json::from_str(reply.trim()).map_err(|e| Error::LanguageModel {
        message: format!("unparseable preference record: {e}"),
    })
}

/// Wraps the language-model call that extracts preferences.
#[derive(Debug)]
pub struct PreferenceExtractor<B> {
    backend: Arc<B>,
    temperature: f32,
    deadline: Duration,
    observer: Observer,
}

impl<B> Clone for PreferenceExtractor<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            temperature: self.temperature,
            deadline: self.deadline,
            observer: self.observer.clone(),
        }
    }
}

impl<B: CompletionBackend> PreferenceExtractor<B> {
    /// Creates an extractor; `deadline` bounds each call.
    #[must_use]
    pub fn new(
        backend: Arc<B>,
        settings: &LanguageModelSettings,
        deadline: Duration,
        observer: Observer,
    ) -> Self {
        Self {
            backend,
            temperature: settings.extraction_temperature,
            deadline,
            observer,
        }
    }

    /// Runs the extraction, surfacing every failure.
    ///
    /// # Errors
    /// Returns an error if the call fails, times out, or the reply does not parse.
    pub async fn try_extract(&self, free_text: &str) -> Result<SearchPreference> {
        let request = CompletionRequest {
            system: EXTRACTION_INSTRUCTION.to_string(),
            user: free_text.to_string(),
            temperature: self.temperature,
            max_tokens: None,
            json_output: true,
        };
        let reply = tokio::time::timeout(self.deadline, self.backend.complete(request))
            .await
            .map_err(|_| Error::Timeout {
                operation: "preference extraction",
            })??;
        parse_preference(&reply)
    }

    /// Extracts preferences, falling back to an empty record on any failure.
    #[instrument(skip(self))]
    pub async fn extract(&self, free_text: &str) -> SearchPreference {
        match self.try_extract(free_text).await {
            Ok(preference) => {
                debug!(?preference, "Preferences extracted");
                preference
            }
            Err(e) => {
                self.observer.report(Degradation::ExtractionDegraded, &e);
                SearchPreference::default()
            }
        }
    }
}
