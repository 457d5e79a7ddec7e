//! Merchant business logic - Storefront profiles linked to identities.
//!
//! A merchant profile is created at registration (account type = merchant) or
//! later through the setup flow, and afterwards only its linked user may edit it.

use crate::{
    entities::{Merchant, merchant},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use tracing::{info, instrument};

/// Profile fields a merchant fills in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerchantProfile {
    /// Business display name (required)
    pub name: String,
    /// Contact email
    pub email: Option<String>,
    /// About the business
    pub description: Option<String>,
    /// Storefront website
    pub website: Option<String>,
    /// Logo image
    pub logo_url: Option<String>,
}

impl MerchantProfile {
    /// A profile with only a name set.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

pub(crate) fn validated_name(profile: &MerchantProfile) -> Result<String> {
    let name = profile.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput {
            message: "Please provide a merchant name".to_string(),
        });
    }
    Ok(name.to_string())
}

/// Finds the merchant profile linked to an identity.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_merchant_by_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Option<merchant::Model>> {
    Merchant::find()
        .filter(merchant::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates an active merchant profile for `user_id`.
///
/// # Errors
/// Returns an error if the name is blank or the insert fails (including when the
/// user already has a profile).
#[instrument(skip(db, profile))]
pub async fn create_merchant(
    db: &DatabaseConnection,
    user_id: &str,
    profile: MerchantProfile,
) -> Result<merchant::Model> {
    let name = validated_name(&profile)?;
    let now = chrono::Utc::now().naive_utc();

    let merchant = merchant::ActiveModel {
        user_id: Set(user_id.to_string()),
        name: Set(name),
        email: Set(profile.email),
        description: Set(profile.description),
        website: Set(profile.website),
        logo_url: Set(profile.logo_url),
        status: Set(merchant::MerchantStatus::Active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = merchant.insert(db).await?;
    info!(merchant_id = created.id, "Merchant profile created");
    Ok(created)
}

/// Replaces the profile fields of the merchant linked to `user_id`.
///
/// The lookup is by linked user, so a user can only ever edit their own profile.
/// Email and status are left untouched.
///
/// # Errors
/// Returns an error if:
/// - The name is blank
/// - The user has no merchant profile
/// - The database update fails
#[instrument(skip(db, profile))]
pub async fn update_merchant_profile(
    db: &DatabaseConnection,
    user_id: &str,
    profile: MerchantProfile,
) -> Result<merchant::Model> {
    let name = validated_name(&profile)?;

    let mut merchant: merchant::ActiveModel = get_merchant_by_user(db, user_id)
        .await?
        .ok_or_else(|| Error::MerchantNotFound {
            user_id: user_id.to_string(),
        })?
        .into();

    merchant.name = Set(name);
    merchant.description = Set(profile.description);
    merchant.website = Set(profile.website);
    merchant.logo_url = Set(profile.logo_url);
    merchant.updated_at = Set(chrono::Utc::now().naive_utc());

    merchant.update(db).await.map_err(Into::into)
}
