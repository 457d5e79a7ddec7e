//! Database configuration module for the coffee discovery core.
//!
//! This module handles the table store connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust structs.
//! In production `DATABASE_URL` points at the hosted Postgres instance behind the
//! backend-as-a-service; locally it falls back to a `SQLite` file.

use crate::entities::{Admin, Merchant, Product, UserQuery};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/coffee_discovery.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// File path of a file-backed `SQLite` URL; `None` for in-memory and non-`SQLite` URLs.
fn sqlite_file_path(database_url: &str) -> Option<&Path> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(Path::new(path))
}

/// Creates the directory a file-backed `SQLite` database lives in, if missing.
fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let parent = sqlite_file_path(database_url)
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = parent {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Establishes a connection to the table store named by `DATABASE_URL`.
///
/// Falls back to a default local `SQLite` file if no environment variable is set;
/// its directory is created on first use.
#[instrument]
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    ensure_sqlite_dir(&database_url)?;
    debug!("Connecting to table store");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all tables from the entity definitions, skipping ones that already exist.
///
/// Merchants are created before products because products reference them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut merchant_table = schema.create_table_from_entity(Merchant);
    let mut admin_table = schema.create_table_from_entity(Admin);
    let mut product_table = schema.create_table_from_entity(Product);
    let mut query_table = schema.create_table_from_entity(UserQuery);

    db.execute(builder.build(merchant_table.if_not_exists())).await?;
    db.execute(builder.build(admin_table.if_not_exists())).await?;
    db.execute(builder.build(product_table.if_not_exists())).await?;
    db.execute(builder.build(query_table.if_not_exists())).await?;

    info!("Database tables ensured.");
    Ok(())
}
