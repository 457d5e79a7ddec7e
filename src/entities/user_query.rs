//! User query entity - Append-only audit log of searches.
//!
//! Each row keeps the raw query text, the preference record that was actually
//! used to filter the catalog, and how many products matched.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User query database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_queries")]
pub struct Model {
    /// Unique identifier for the log entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Raw text the user typed
    pub query_text: String,
    /// Snapshot of the preference record used for filtering
    #[sea_orm(column_type = "Json")]
    pub preferences: Json,
    /// Number of products returned
    pub result_count: i64,
    /// When the entry was written
    pub timestamp: DateTimeUtc,
}

/// `UserQuery` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
