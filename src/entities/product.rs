//! Product entity - Represents a coffee in the catalog.
//!
//! Products are created either by an administrator (no owning merchant) or by
//! a merchant (owner set to their merchant id). Roast level and acidity are
//! stored as lowercase strings so that a filter built from unvalidated
//! language-model output simply matches nothing instead of failing.

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Roast level of a coffee
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum RoastLevel {
    /// Light roast
    #[sea_orm(string_value = "light")]
    Light,
    /// Medium roast
    #[sea_orm(string_value = "medium")]
    Medium,
    /// Dark roast
    #[sea_orm(string_value = "dark")]
    Dark,
}

/// Perceived acidity of a coffee
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Acidity {
    /// Low acidity
    #[sea_orm(string_value = "low")]
    Low,
    /// Medium acidity
    #[sea_orm(string_value = "medium")]
    Medium,
    /// High acidity
    #[sea_orm(string_value = "high")]
    High,
}

/// Ordered list of flavor notes, stored as a JSON array
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct FlavorNotes(pub Vec<String>);

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Yirgacheffe Natural")
    pub name: String,
    /// Free-text origin (country, region or farm)
    pub origin: Option<String>,
    /// Roast level, if known
    pub roast_level: Option<RoastLevel>,
    /// Acidity, if known
    pub acidity: Option<Acidity>,
    /// Price in dollars, never negative
    pub price: f64,
    /// Marketing description, possibly machine-generated
    pub description: Option<String>,
    /// Product image
    pub image_url: Option<String>,
    /// Where the coffee can be bought
    pub purchase_url: Option<String>,
    /// Flavor notes without empty entries
    #[sea_orm(column_type = "Json")]
    pub flavor_notes: FlavorNotes,
    /// Whether the product is highlighted in listings
    pub featured: bool,
    /// Owning merchant, None for admin-curated products
    pub merchant_id: Option<i64>,
    /// When the product was created
    pub created_at: DateTime,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A product may belong to one merchant
    #[sea_orm(
        belongs_to = "super::merchant::Entity",
        from = "Column::MerchantId",
        to = "super::merchant::Column::Id"
    )]
    Merchant,
}

impl Related<super::merchant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Merchant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
