//! Backend credentials loaded from the process environment.
//!
//! Both external backends need an endpoint and a credential. A missing pair is
//! reported with `error!` at startup but is not fatal: the matching client is
//! built unconfigured and fails with [`Error::Config`](crate::errors::Error)
//! the first time it is used.

use tracing::error;

/// Endpoint + key for one external backend.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendCredentials {
    /// Base URL of the backend
    pub url: String,
    /// API key sent with every request
    pub key: String,
}

impl std::fmt::Debug for BackendCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendCredentials")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Credentials for every external backend, each possibly absent.
#[derive(Debug, Clone, Default)]
pub struct BackendEnv {
    /// Identity + table backend (`SUPABASE_URL`, `SUPABASE_ANON_KEY`)
    pub identity: Option<BackendCredentials>,
    /// Language-model backend (`OPENAI_BASE_URL`, `OPENAI_API_KEY`)
    pub language_model: Option<BackendCredentials>,
}

/// Default endpoint for the language-model backend when `OPENAI_BASE_URL` is unset.
pub const DEFAULT_LANGUAGE_MODEL_URL: &str = "https://api.openai.com/v1";

/// Reads both credential pairs from the environment, logging any that are missing.
#[must_use]
pub fn load_backend_env() -> BackendEnv {
    load_backend_env_with(|name| std::env::var(name).ok())
}

/// Same as [`load_backend_env`], reading variables through `lookup`.
pub fn load_backend_env_with<F>(lookup: F) -> BackendEnv
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let identity = match (non_empty("SUPABASE_URL"), non_empty("SUPABASE_ANON_KEY")) {
        (Some(url), Some(key)) => Some(BackendCredentials { url, key }),
        _ => {
            error!("Missing identity backend environment variables (SUPABASE_URL, SUPABASE_ANON_KEY).");
            None
        }
    };

    let language_model = match non_empty("OPENAI_API_KEY") {
        Some(key) => Some(BackendCredentials {
            url: non_empty("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LANGUAGE_MODEL_URL.to_string()),
            key,
        }),
        None => {
            error!("Missing language model environment variable (OPENAI_API_KEY).");
            None
        }
    };

    BackendEnv {
        identity,
        language_model,
    }
}
