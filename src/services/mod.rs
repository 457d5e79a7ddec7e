//! Boundary collaborators: the hosted identity backend and the language-model backend.

/// Identity backend trait and GoTrue-compatible HTTP client
pub mod identity;
/// Language-model backend trait and OpenAI-compatible HTTP client
pub mod llm;

pub use identity::{AuthEvent, AuthSession, AuthUser, GoTrueClient, IdentityProvider, SignUpOutcome};
pub use llm::{CompletionBackend, CompletionRequest, OpenAiClient};
