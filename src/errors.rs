//! Unified error type for the coffee discovery core.
//!
//! Only [`Error::InvalidQuery`] and persistence failures are meant to reach a
//! user. Everything the language-model backend or the query log can throw is
//! absorbed by the caller and reported as a [`Degradation`] instead.

use thiserror::Error;

/// Every failure the crate can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed configuration (env vars, settings file).
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong with the configuration
        message: String,
    },

    /// Search text was empty or whitespace-only.
    #[error("Please enter a search query")]
    InvalidQuery,

    /// Price that is negative, NaN or infinite.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// A required field was missing or malformed.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Which field is wrong and why
        message: String,
    },

    /// No product row with this id.
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// The id that was looked up
        id: i64,
    },

    /// No merchant profile linked to this user.
    #[error("Merchant not found for user: {user_id}")]
    MerchantNotFound {
        /// Identity id of the user
        user_id: String,
    },

    /// The caller's role does not allow this mutation.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Why the mutation was rejected
        message: String,
    },

    /// The identity backend rejected a request.
    #[error("Authentication error: {message}")]
    Auth {
        /// Message reported by the identity backend
        message: String,
    },

    /// The language-model backend failed or returned unusable content.
    #[error("Language model error: {message}")]
    LanguageModel {
        /// Message reported by the backend or the parser
        message: String,
    },

    /// An external call exceeded its deadline.
    #[error("Timed out during {operation}")]
    Timeout {
        /// Name of the step that timed out
        operation: &'static str,
    },

    /// Table store failure.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Transport failure talking to an external backend.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Body that failed to (de)serialize.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem failure (settings file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is surfaced to the user rather than degraded.
    #[must_use]
    pub const fn is_user_visible(&self) -> bool {
        !matches!(self, Self::LanguageModel { .. })
    }

    /// Message suitable for showing to an end user.
    ///
    /// Persistence and transport failures collapse into one generic,
    /// retry-able message; domain errors keep their own wording.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Http(_) | Self::Timeout { .. } | Self::Io(_) => {
                "Something went wrong with your search. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Non-fatal failures that were absorbed by a permissive default.
///
/// These are never returned to a caller; they are logged and handed to the
/// observability hook of [`crate::core::best_effort::BestEffort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    /// Preference extraction failed; search ran with an empty filter.
    ExtractionDegraded,
    /// Description generation failed; fallback text was used.
    GenerationDegraded,
    /// Search-query suggestion failed; a locally built query was used.
    SuggestionDegraded,
    /// Writing the query log entry failed.
    LoggingFailure,
}

impl Degradation {
    /// Short name used as the `degraded` field in log events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExtractionDegraded => "extraction",
            Self::GenerationDegraded => "generation",
            Self::SuggestionDegraded => "suggestion",
            Self::LoggingFailure => "query_log",
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_failure_has_generic_message() {
        let err = Error::Database(sea_orm::DbErr::Custom("connection reset".to_string()));
        assert!(err.is_user_visible());
        assert_eq!(
            err.user_message(),
            "Something went wrong with your search. Please try again."
        );
    }

    #[test]
    fn test_invalid_query_keeps_its_message() {
        assert_eq!(Error::InvalidQuery.user_message(), "Please enter a search query");
    }

    #[test]
    fn test_language_model_errors_are_not_user_visible() {
        let err = Error::LanguageModel {
            message: "bad json".to_string(),
        };
        assert!(!err.is_user_visible());
    }
}
