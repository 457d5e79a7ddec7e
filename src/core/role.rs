//! Role resolution - Maps an authenticated identity to what it may do.
//!
//! Roles are not stored on the identity. They are derived from two membership
//! tables, checked in a fixed order:
//!
//! 1. `admins` - a row with the user's id makes them [`Role::Admin`]
//! 2. `merchants` - a row with the user's id makes them [`Role::Merchant`]
//! 3. otherwise [`Role::User`]
//!
//! The first match wins, so a user listed in both tables is an admin.

use crate::{
    entities::{Admin, Merchant, admin, merchant},
    errors::Result,
};
use sea_orm::{Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

/// What an authenticated identity is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "merchant_id", rename_all = "lowercase")]
pub enum Role {
    /// Manages every product and reads the query log
    Admin,
    /// Manages products owned by this merchant id
    Merchant(i64),
    /// Searches only
    User,
}

impl Role {
    /// Lowercase role name (`admin`, `merchant`, `user`)
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Merchant(_) => "merchant",
            Self::User => "user",
        }
    }

    /// Merchant id for merchant roles
    #[must_use]
    pub const fn merchant_id(&self) -> Option<i64> {
        match self {
            Self::Merchant(id) => Some(*id),
            Self::Admin | Self::User => None,
        }
    }
}

/// Checks the membership tables in precedence order.
///
/// # Errors
/// Returns an error if either lookup fails.
pub async fn lookup_role(db: &DatabaseConnection, user_id: &str) -> Result<Role> {
    let is_admin = Admin::find()
        .filter(admin::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .is_some();
    if is_admin {
        return Ok(Role::Admin);
    }

    let merchant = Merchant::find()
        .filter(merchant::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    if let Some(merchant) = merchant {
        return Ok(Role::Merchant(merchant.id));
    }

    Ok(Role::User)
}

/// Resolves the role for a user, degrading to [`Role::User`] if a lookup fails.
#[instrument(skip(db))]
pub async fn resolve_role(db: &DatabaseConnection, user_id: &str) -> Role {
    match lookup_role(db, user_id).await {
        Ok(role) => {
            debug!(role = role.as_str(), "Role resolved");
            role
        }
        Err(e) => {
            error!("Error getting user role: {e}");
            Role::User
        }
    }
}

/// Grants administrator membership to a user.
///
/// # Errors
/// Returns an error if the insert fails (e.g. the user is already an admin).
pub async fn grant_admin(db: &DatabaseConnection, user_id: &str) -> Result<admin::Model> {
    let row = admin::ActiveModel {
        user_id: Set(user_id.to_string()),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };
    row.insert(db).await.map_err(Into::into)
}
