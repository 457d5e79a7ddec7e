//! Application settings loaded from `discovery.toml`.
//!
//! Every field has a default, so the file is optional. When it exists it must
//! parse; a malformed file is a startup error. Seed products listed here are
//! inserted into an empty catalog on first run.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default settings file, overridable with `DISCOVERY_CONFIG`
pub const DEFAULT_SETTINGS_PATH: &str = "discovery.toml";

/// Configuration structure representing the entire settings file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Language-model request tuning
    pub language_model: LanguageModelSettings,
    /// Search pipeline tuning
    pub search: SearchSettings,
    /// Identity backend tuning
    pub identity: IdentitySettings,
    /// Products inserted when the catalog is empty
    pub seed_products: Vec<SeedProduct>,
}

/// Model name, sampling and limits for each language-model task
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LanguageModelSettings {
    /// Model identifier sent with every request
    pub model: String,
    /// Temperature for preference extraction
    pub extraction_temperature: f32,
    /// Temperature for description generation
    pub description_temperature: f32,
    /// Token cap for description generation
    pub description_max_tokens: u32,
    /// Temperature for web search query suggestion
    pub search_query_temperature: f32,
    /// Token cap for web search query suggestion
    pub search_query_max_tokens: u32,
    /// Transport timeout for a single request, in seconds
    pub request_timeout_secs: u64,
}

impl Default for LanguageModelSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            extraction_temperature: 0.3,
            description_temperature: 0.7,
            description_max_tokens: 150,
            search_query_temperature: 0.3,
            search_query_max_tokens: 30,
            request_timeout_secs: 30,
        }
    }
}

impl LanguageModelSettings {
    /// Transport timeout as a [`Duration`]
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Transport settings for the identity backend
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// Timeout for one identity request, in seconds
    pub request_timeout_secs: u64,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 15,
        }
    }
}

impl IdentitySettings {
    /// Request timeout as a [`Duration`]
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Deadlines applied around each external step of a search
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Deadline for one step (extraction or catalog query), in seconds
    pub step_timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            step_timeout_secs: 20,
        }
    }
}

impl SearchSettings {
    /// Step deadline as a [`Duration`]
    #[must_use]
    pub const fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

/// A product inserted into an empty catalog
#[derive(Debug, Clone, Deserialize)]
pub struct SeedProduct {
    /// Product name
    pub name: String,
    /// Free-text origin
    #[serde(default)]
    pub origin: Option<String>,
    /// `light`, `medium` or `dark`
    #[serde(default)]
    pub roast_level: Option<String>,
    /// `low`, `medium` or `high`
    #[serde(default)]
    pub acidity: Option<String>,
    /// Price in dollars
    pub price: f64,
    /// Marketing description
    #[serde(default)]
    pub description: Option<String>,
    /// Comma-separated flavor notes, as typed into the admin form
    #[serde(default)]
    pub flavor_notes: String,
    /// Highlight in listings
    #[serde(default)]
    pub featured: bool,
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load settings from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read settings file {}: {e}", path_ref.display()),
    })?;
    parse_settings(&contents)
}

/// Parses settings from TOML text
///
/// # Errors
/// Returns an error if the TOML is invalid or a field has the wrong type.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse settings: {e}"),
    })
}

/// Loads settings from `DISCOVERY_CONFIG` or `./discovery.toml`, using defaults
/// when the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_default_settings() -> Result<Settings> {
    let path =
        std::env::var("DISCOVERY_CONFIG").unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
    if Path::new(&path).exists() {
        load_settings(&path)
    } else {
        tracing::info!("No settings file at {path}, using defaults.");
        Ok(Settings::default())
    }
}
