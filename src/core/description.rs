//! Description generation - Marketing copy for catalog entries.
//!
//! One attempt, no retries. When generation is unavailable the catalog forms
//! still work: the generator returns [`FALLBACK_DESCRIPTION`] instead of an error.

use crate::{
    config::settings::LanguageModelSettings,
    core::best_effort::Observer,
    errors::{Degradation, Error, Result},
    services::llm::{CompletionBackend, CompletionRequest},
};
use std::sync::Arc;
use std::time::Duration;

/// Text used whenever generation fails
pub const FALLBACK_DESCRIPTION: &str =
    "A delightful coffee with a unique character and flavor profile.";

const DESCRIPTION_INSTRUCTION: &str = "You are a coffee expert who writes engaging, concise \
coffee descriptions. Write a compelling 2-3 sentence description for a coffee product with the \
provided details. Focus on flavor profile, origin characteristics, and brewing recommendations.";

/// Attributes the description is written from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoffeeDetails {
    /// Product name
    pub name: String,
    /// Origin, if known
    pub origin: Option<String>,
    /// Roast level, if known
    pub roast_level: Option<String>,
    /// Flavor notes
    pub flavor_notes: Vec<String>,
}

fn render_prompt(details: &CoffeeDetails) -> String {
    let origin = details.origin.as_deref().filter(|s| !s.is_empty()).unwrap_or("Unknown");
    let roast = details
        .roast_level
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("Medium");
    let notes = if details.flavor_notes.is_empty() {
        "Not specified".to_string()
    } else {
        details.flavor_notes.join(", ")
    };
    format!(
        "Generate a description for this coffee:\nName: {}\nOrigin: {origin}\nRoast Level: {roast}\nFlavor Notes: {notes}",
        details.name
    )
}

/// Wraps the language-model call that writes product descriptions.
#[derive(Debug)]
pub struct DescriptionGenerator<B> {
    backend: Arc<B>,
    temperature: f32,
    max_tokens: u32,
    deadline: Duration,
    observer: Observer,
}

impl<B: CompletionBackend> DescriptionGenerator<B> {
    /// Creates a generator; `deadline` bounds each call.
    #[must_use]
    pub fn new(
        backend: Arc<B>,
        settings: &LanguageModelSettings,
        deadline: Duration,
        observer: Observer,
    ) -> Self {
        Self {
            backend,
            temperature: settings.description_temperature,
            max_tokens: settings.description_max_tokens,
            deadline,
            observer,
        }
    }

    async fn try_generate(&self, details: &CoffeeDetails) -> Result<String> {
        let request = CompletionRequest {
            system: DESCRIPTION_INSTRUCTION.to_string(),
            user: render_prompt(details),
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            json_output: false,
        };
        let text = tokio::time::timeout(self.deadline, self.backend.complete(request))
            .await
            .map_err(|_| Error::Timeout {
                operation: "description generation",
            })??;
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::LanguageModel {
                message: "empty description".to_string(),
            });
        }
        Ok(text.to_string())
    }

    /// Generates a description, or [`FALLBACK_DESCRIPTION`] on any failure.
    pub async fn generate(&self, details: &CoffeeDetails) -> String {
        match self.try_generate(details).await {
            Ok(text) => text,
            Err(e) => {
                self.observer.report(Degradation::GenerationDegraded, &e);
                FALLBACK_DESCRIPTION.to_string()
            }
        }
    }
}
