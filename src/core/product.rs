//! Product business logic - Catalog CRUD and listing filters.
//!
//! This module provides functions for creating, retrieving, listing, updating and deleting
//! coffee products. Listing takes a [`CatalogFilter`]: every supplied field is ANDed, origin is
//! a case-insensitive substring match, the other fields are exact matches, and results are
//! always ordered newest first. The exact fields are pushed down to SQL; origin is matched in
//! Rust with Unicode case folding on both sides, since `SQLite`'s `LOWER` only folds ASCII. Mutations take the caller's [`Role`]: admins may change any
//! product, merchants only the products they own, plain users none.

use crate::{
    config::settings::SeedProduct,
    core::role::Role,
    entities::{
        Product,
        product::{self, Acidity, FlavorNotes, RoastLevel},
    },
    errors::{Error, Result},
};
use sea_orm::{Condition, PaginatorTrait, QueryOrder, Set, prelude::*};
use tracing::{debug, info, instrument};

/// Editable product fields, as submitted by the admin or merchant form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductInput {
    /// Product name (required)
    pub name: String,
    /// Free-text origin
    pub origin: Option<String>,
    /// Roast level
    pub roast_level: Option<RoastLevel>,
    /// Acidity
    pub acidity: Option<Acidity>,
    /// Price in dollars (required, non-negative)
    pub price: f64,
    /// Marketing description
    pub description: Option<String>,
    /// Product image
    pub image_url: Option<String>,
    /// Purchase link
    pub purchase_url: Option<String>,
    /// Flavor notes; blank entries are dropped on write
    pub flavor_notes: Vec<String>,
    /// Highlight in listings (admin only)
    pub featured: bool,
}

/// Predicates applied to the product listing.
///
/// `None` fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    /// Exact roast level
    pub roast_level: Option<String>,
    /// Exact acidity
    pub acidity: Option<String>,
    /// Case-insensitive substring of origin
    pub origin: Option<String>,
    /// Exact owning merchant
    pub merchant_id: Option<i64>,
}

impl CatalogFilter {
    /// A filter matching only one merchant's products.
    #[must_use]
    pub fn for_merchant(merchant_id: i64) -> Self {
        Self {
            merchant_id: Some(merchant_id),
            ..Self::default()
        }
    }

    /// Whether the filter imposes no constraint at all.
    #[must_use]
    pub const fn is_unconstrained(&self) -> bool {
        self.roast_level.is_none()
            && self.acidity.is_none()
            && self.origin.is_none()
            && self.merchant_id.is_none()
    }

    /// Builds the SQL condition for the exact-match fields.
    ///
    /// Origin is not part of it; see [`CatalogFilter::matches_origin`].
    #[must_use]
    pub fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(roast_level) = &self.roast_level {
            condition = condition.add(product::Column::RoastLevel.eq(roast_level.as_str()));
        }
        if let Some(acidity) = &self.acidity {
            condition = condition.add(product::Column::Acidity.eq(acidity.as_str()));
        }
        if let Some(merchant_id) = self.merchant_id {
            condition = condition.add(product::Column::MerchantId.eq(merchant_id));
        }
        condition
    }

    /// Case-insensitive substring test of a product origin against the origin filter.
    ///
    /// Without an origin filter everything matches; with one, products without an
    /// origin never do.
    #[must_use]
    pub fn matches_origin(&self, origin: Option<&str>) -> bool {
        let Some(wanted) = &self.origin else {
            return true;
        };
        origin.is_some_and(|origin| origin.to_lowercase().contains(&wanted.to_lowercase()))
    }
}

/// Splits comma-separated flavor notes, trimming each and dropping empty entries.
///
/// `"chocolate, caramel, "` becomes `["chocolate", "caramel"]`.
#[must_use]
pub fn parse_flavor_notes(raw: &str) -> Vec<String> {
    clean_flavor_notes(raw.split(','))
}

fn clean_flavor_notes<I, S>(notes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    notes
        .into_iter()
        .map(|note| note.as_ref().trim().to_string())
        .filter(|note| !note.is_empty())
        .collect()
}

/// Parses a roast level from form input; blank means unset.
///
/// # Errors
/// Returns an error if the value is not `light`, `medium` or `dark`.
pub fn parse_roast_level(raw: &str) -> Result<Option<RoastLevel>> {
    match raw.trim().to_lowercase().as_str() {
        "" => Ok(None),
        "light" => Ok(Some(RoastLevel::Light)),
        "medium" => Ok(Some(RoastLevel::Medium)),
        "dark" => Ok(Some(RoastLevel::Dark)),
        other => Err(Error::InvalidInput {
            message: format!("unknown roast level '{other}'"),
        }),
    }
}

/// Parses an acidity from form input; blank means unset.
///
/// # Errors
/// Returns an error if the value is not `low`, `medium` or `high`.
pub fn parse_acidity(raw: &str) -> Result<Option<Acidity>> {
    match raw.trim().to_lowercase().as_str() {
        "" => Ok(None),
        "low" => Ok(Some(Acidity::Low)),
        "medium" => Ok(Some(Acidity::Medium)),
        "high" => Ok(Some(Acidity::High)),
        other => Err(Error::InvalidInput {
            message: format!("unknown acidity '{other}'"),
        }),
    }
}

fn validate(input: &ProductInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(Error::InvalidInput {
            message: "Product name cannot be empty".to_string(),
        });
    }

    if input.price < 0.0 || !input.price.is_finite() {
        return Err(Error::InvalidAmount {
            amount: input.price,
        });
    }

    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Checks that `role` may modify `product`.
///
/// # Errors
/// Returns [`Error::Forbidden`] for plain users and for merchants touching
/// products they do not own.
pub fn authorize_mutation(role: &Role, product: &product::Model) -> Result<()> {
    match role {
        Role::Admin => Ok(()),
        Role::Merchant(merchant_id) if product.merchant_id == Some(*merchant_id) => Ok(()),
        Role::Merchant(_) => Err(Error::Forbidden {
            message: format!("product {} belongs to another merchant", product.id),
        }),
        Role::User => Err(Error::Forbidden {
            message: "only admins and merchants can manage products".to_string(),
        }),
    }
}

/// Lists products matching `filter`, newest first, without pagination.
///
/// # Errors
/// Returns an error if the database query fails.
#[instrument(skip(db))]
pub async fn list_products(
    db: &DatabaseConnection,
    filter: &CatalogFilter,
) -> Result<Vec<product::Model>> {
    let products: Vec<product::Model> = Product::find()
        .filter(filter.condition())
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .filter(|p| filter.matches_origin(p.origin.as_deref()))
        .collect();
    debug!(count = products.len(), "Listed products");
    Ok(products)
}

/// Retrieves a specific product by its unique ID.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product_by_id(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a product on behalf of `role`.
///
/// Admin submissions are admin-curated (no owner). Merchant submissions are
/// stamped with the merchant's id and are never featured.
///
/// # Errors
/// Returns an error if:
/// - The caller is a plain user
/// - The product name is empty or whitespace-only
/// - The price is negative or not finite (NaN, infinity)
/// - The database insert operation fails
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_product(
    db: &DatabaseConnection,
    role: &Role,
    input: ProductInput,
) -> Result<product::Model> {
    let (merchant_id, featured) = match role {
        Role::Admin => (None, input.featured),
        Role::Merchant(id) => (Some(*id), false),
        Role::User => {
            return Err(Error::Forbidden {
                message: "only admins and merchants can add products".to_string(),
            });
        }
    };
    validate(&input)?;

    let product = product::ActiveModel {
        name: Set(input.name.trim().to_string()),
        origin: Set(non_blank(input.origin)),
        roast_level: Set(input.roast_level),
        acidity: Set(input.acidity),
        price: Set(input.price),
        description: Set(non_blank(input.description)),
        image_url: Set(non_blank(input.image_url)),
        purchase_url: Set(non_blank(input.purchase_url)),
        flavor_notes: Set(FlavorNotes(clean_flavor_notes(input.flavor_notes))),
        featured: Set(featured),
        merchant_id: Set(merchant_id),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };
    let created = product.insert(db).await?;
    info!(product_id = created.id, "Product created");
    Ok(created)
}

/// Replaces the editable fields of a product.
///
/// Owner and creation time never change. Merchants cannot change the featured flag.
///
/// # Errors
/// Returns an error if:
/// - The product does not exist
/// - The caller may not modify it
/// - The name or price is invalid
/// - The database update operation fails
#[instrument(skip(db, input))]
pub async fn update_product(
    db: &DatabaseConnection,
    role: &Role,
    product_id: i64,
    input: ProductInput,
) -> Result<product::Model> {
    validate(&input)?;

    let existing = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })?;
    authorize_mutation(role, &existing)?;

    let featured = if matches!(role, Role::Admin) {
        input.featured
    } else {
        existing.featured
    };

    let mut product: product::ActiveModel = existing.into();
    product.name = Set(input.name.trim().to_string());
    product.origin = Set(non_blank(input.origin));
    product.roast_level = Set(input.roast_level);
    product.acidity = Set(input.acidity);
    product.price = Set(input.price);
    product.description = Set(non_blank(input.description));
    product.image_url = Set(non_blank(input.image_url));
    product.purchase_url = Set(non_blank(input.purchase_url));
    product.flavor_notes = Set(FlavorNotes(clean_flavor_notes(input.flavor_notes)));
    product.featured = Set(featured);

    product.update(db).await.map_err(Into::into)
}

/// Permanently deletes a product, returning the removed row.
///
/// # Errors
/// Returns an error if:
/// - The product does not exist
/// - The caller may not modify it
/// - The database delete operation fails
#[instrument(skip(db))]
pub async fn delete_product(
    db: &DatabaseConnection,
    role: &Role,
    product_id: i64,
) -> Result<product::Model> {
    let existing = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })?;
    authorize_mutation(role, &existing)?;

    Product::delete_by_id(product_id).exec(db).await?;
    info!(product_id, "Product deleted");
    Ok(existing)
}

/// Inserts the configured seed products when the catalog is empty.
///
/// Seeded products are admin-curated (no owner). Returns how many were inserted;
/// a non-empty catalog is left alone and yields 0.
///
/// # Errors
/// Returns an error if a seed entry has an unknown roast level or acidity, or
/// if a database operation fails.
#[instrument(skip_all, fields(configured = seeds.len()))]
pub async fn seed_products(db: &DatabaseConnection, seeds: &[SeedProduct]) -> Result<usize> {
    if seeds.is_empty() || Product::find().count(db).await? > 0 {
        return Ok(0);
    }

    for seed in seeds {
        let input = ProductInput {
            name: seed.name.clone(),
            origin: seed.origin.clone(),
            roast_level: parse_roast_level(seed.roast_level.as_deref().unwrap_or_default())?,
            acidity: parse_acidity(seed.acidity.as_deref().unwrap_or_default())?,
            price: seed.price,
            description: seed.description.clone(),
            flavor_notes: parse_flavor_notes(&seed.flavor_notes),
            featured: seed.featured,
            ..ProductInput::default()
        };
        create_product(db, &Role::Admin, input).await?;
    }
    info!(count = seeds.len(), "Seeded catalog");
    Ok(seeds.len())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_parse_flavor_notes_drops_blank_entries() {
        assert_eq!(
            parse_flavor_notes("chocolate, caramel, "),
            vec!["chocolate".to_string(), "caramel".to_string()]
        );
        assert!(parse_flavor_notes(" , ,").is_empty());
        assert!(parse_flavor_notes("").is_empty());
    }

    #[test]
    fn test_parse_enums_from_form_input() {
        assert_eq!(parse_roast_level(" Dark ").unwrap(), Some(RoastLevel::Dark));
        assert_eq!(parse_roast_level("").unwrap(), None);
        assert!(parse_roast_level("burnt").is_err());
        assert_eq!(parse_acidity("low").unwrap(), Some(Acidity::Low));
        assert!(parse_acidity("sour").is_err());
    }

    #[test]
    fn test_matches_origin_folds_unicode_case() {
        let filter = CatalogFilter {
            origin: Some("côte".to_string()),
            ..CatalogFilter::default()
        };
        assert!(filter.matches_origin(Some("CÔTE D'IVOIRE")));
        assert!(!filter.matches_origin(Some("Cote d'Ivoire")));
        assert!(!filter.matches_origin(None));
        assert!(CatalogFilter::default().matches_origin(None));
    }

    #[tokio::test]
    async fn test_create_product_validation() -> Result<()> {
        let db = setup_test_db().await?;

        // Test empty name validation
        let result = create_product(&db, &Role::Admin, product_input("   ", 10.0)).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidInput { .. }));

        // Test negative price validation
        let result = create_product(&db, &Role::Admin, product_input("Test", -10.0)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: -10.0 }
        ));

        // Test NaN price validation
        let result = create_product(&db, &Role::Admin, product_input("Test", f64::NAN)).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));

        // Plain users cannot add products at all
        let result = create_product(&db, &Role::User, product_input("Test", 10.0)).await;
        assert!(matches!(result.unwrap_err(), Error::Forbidden { .. }));

        assert!(list_products(&db, &CatalogFilter::default()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_flavor_notes_round_trip() -> Result<()> {
        let db = setup_test_db().await?;

        let mut input = product_input("Huila", 18.0);
        input.flavor_notes = parse_flavor_notes("chocolate, caramel, ");
        let created = create_product(&db, &Role::Admin, input).await?;

        let stored = get_product_by_id(&db, created.id).await?.unwrap();
        assert_eq!(
            stored.flavor_notes,
            FlavorNotes(vec!["chocolate".to_string(), "caramel".to_string()])
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_products_have_no_owner() -> Result<()> {
        let db = setup_test_db().await?;
        let mut input = product_input("House Blend", 12.0);
        input.featured = true;

        let product = create_product(&db, &Role::Admin, input).await?;
        assert_eq!(product.merchant_id, None);
        assert!(product.featured);
        Ok(())
    }

    #[tokio::test]
    async fn test_merchant_products_are_owned_and_not_featured() -> Result<()> {
        let db = setup_test_db().await?;
        let merchant = create_test_merchant(&db, "user-m").await?;
        let mut input = product_input("Roaster Special", 21.0);
        input.featured = true;

        let product = create_product(&db, &Role::Merchant(merchant.id), input).await?;
        assert_eq!(product.merchant_id, Some(merchant.id));
        assert!(!product.featured);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_products_filters_and_orders_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let older =
            create_catalog_product(&db, "Yirgacheffe", "Ethiopia", RoastLevel::Light, Acidity::High)
                .await?;
        let newer = create_catalog_product(
            &db,
            "Sidamo",
            "ethiopia (Sidama)",
            RoastLevel::Light,
            Acidity::Medium,
        )
        .await?;
        create_catalog_product(&db, "Sumatra", "Indonesia", RoastLevel::Dark, Acidity::Low).await?;

        let all = list_products(&db, &CatalogFilter::default()).await?;
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].name, "Sumatra");

        let filter = CatalogFilter {
            roast_level: Some("light".to_string()),
            origin: Some("ETHIOP".to_string()),
            ..CatalogFilter::default()
        };
        let found = list_products(&db, &filter).await?;
        assert_eq!(found, vec![newer, older]);

        let filter = CatalogFilter {
            acidity: Some("spicy".to_string()),
            ..CatalogFilter::default()
        };
        assert!(list_products(&db, &filter).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_origin_filter_treats_wildcards_literally() -> Result<()> {
        let db = setup_test_db().await?;
        create_catalog_product(&db, "Kenya AA", "Kenya", RoastLevel::Medium, Acidity::High).await?;

        let filter = CatalogFilter {
            origin: Some("%".to_string()),
            ..CatalogFilter::default()
        };
        assert!(list_products(&db, &filter).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_origin_filter_is_case_insensitive_beyond_ascii() -> Result<()> {
        let db = setup_test_db().await?;
        create_catalog_product(&db, "Cajamarca", "PERÚ", RoastLevel::Medium, Acidity::Medium)
            .await?;
        create_catalog_product(&db, "Man", "CÔTE D'IVOIRE", RoastLevel::Dark, Acidity::Low)
            .await?;

        for (wanted, expected) in [
            ("Perú", "Cajamarca"),
            ("PERÚ", "Cajamarca"),
            ("perú", "Cajamarca"),
            ("Côte", "Man"),
            ("CÔTE", "Man"),
        ] {
            let filter = CatalogFilter {
                origin: Some(wanted.to_string()),
                ..CatalogFilter::default()
            };
            let products = list_products(&db, &filter).await?;
            assert_eq!(products.len(), 1, "origin filter {wanted}");
            assert_eq!(products[0].name, expected);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_list_products_for_merchant() -> Result<()> {
        let db = setup_test_db().await?;
        let merchant = create_test_merchant(&db, "user-m").await?;
        create_product(&db, &Role::Admin, product_input("Admin Pick", 10.0)).await?;
        let own =
            create_product(&db, &Role::Merchant(merchant.id), product_input("Own", 11.0)).await?;

        let listed = list_products(&db, &CatalogFilter::for_merchant(merchant.id)).await?;
        assert_eq!(listed, vec![own]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_by_owner() -> Result<()> {
        let db = setup_test_db().await?;
        let merchant = create_test_merchant(&db, "user-m").await?;
        let role = Role::Merchant(merchant.id);
        let product = create_product(&db, &role, product_input("Original", 10.0)).await?;

        let mut input = product_input("Updated", 15.0);
        input.flavor_notes = vec!["berry".to_string(), "  ".to_string()];
        input.featured = true;
        let updated = update_product(&db, &role, product.id, input).await?;

        assert_eq!(updated.name, "Updated");
        assert_eq!(updated.price, 15.0);
        assert_eq!(updated.flavor_notes, FlavorNotes(vec!["berry".to_string()]));
        assert!(!updated.featured);
        assert_eq!(updated.merchant_id, Some(merchant.id));
        assert_eq!(updated.created_at, product.created_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_merchant_cannot_touch_other_products() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_merchant(&db, "user-owner").await?;
        let other = create_test_merchant(&db, "user-other").await?;
        let product =
            create_product(&db, &Role::Merchant(owner.id), product_input("Mine", 10.0)).await?;
        let curated = create_product(&db, &Role::Admin, product_input("Curated", 10.0)).await?;

        let result = update_product(
            &db,
            &Role::Merchant(other.id),
            product.id,
            product_input("Stolen", 1.0),
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Forbidden { .. }));

        let result = delete_product(&db, &Role::Merchant(owner.id), curated.id).await;
        assert!(matches!(result.unwrap_err(), Error::Forbidden { .. }));

        // Admins may modify anything
        delete_product(&db, &Role::Admin, product.id).await?;
        assert!(get_product_by_id(&db, product.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_product_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let result = delete_product(&db, &Role::Admin, 999).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ProductNotFound { id: 999 }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_products_only_into_empty_catalog() -> Result<()> {
        let db = setup_test_db().await?;
        let seeds = vec![SeedProduct {
            name: "Sidamo".to_string(),
            origin: Some("Ethiopia".to_string()),
            roast_level: Some("Light".to_string()),
            acidity: Some("high".to_string()),
            price: 19.5,
            description: None,
            flavor_notes: "lemon, bergamot".to_string(),
            featured: true,
        }];

        assert_eq!(seed_products(&db, &seeds).await?, 1);
        assert_eq!(seed_products(&db, &seeds).await?, 0);

        let products = list_products(&db, &CatalogFilter::default()).await?;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].roast_level, Some(RoastLevel::Light));
        assert_eq!(products[0].merchant_id, None);
        assert!(products[0].featured);
        assert_eq!(
            products[0].flavor_notes,
            FlavorNotes(vec!["lemon".to_string(), "bergamot".to_string()])
        );
        Ok(())
    }
}
