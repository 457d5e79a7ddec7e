//! Merchant entity - Storefront profile linked 1:1 to an identity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether a merchant storefront is live
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum MerchantStatus {
    /// Listed and able to manage products
    #[sea_orm(string_value = "active")]
    Active,
    /// Suspended or closed
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

/// Merchant database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "merchants")]
pub struct Model {
    /// Unique identifier for the merchant
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Identity id of the linked user
    #[sea_orm(unique)]
    pub user_id: String,
    /// Business display name
    pub name: String,
    /// Contact email captured at registration
    pub email: Option<String>,
    /// About the business
    pub description: Option<String>,
    /// Storefront website
    pub website: Option<String>,
    /// Logo image
    pub logo_url: Option<String>,
    /// Active or inactive
    pub status: MerchantStatus,
    /// When the profile was created
    pub created_at: DateTime,
    /// When the profile was last edited
    pub updated_at: DateTime,
}

/// Defines relationships between Merchant and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One merchant owns many products
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
