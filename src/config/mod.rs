/// Table store connection and schema creation
pub mod database;

/// Backend credentials from environment variables
pub mod env;

/// Optional TOML settings with defaults and catalog seed data
pub mod settings;
