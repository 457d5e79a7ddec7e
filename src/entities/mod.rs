//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod admin;
pub mod merchant;
pub mod product;
pub mod user_query;

// Re-export specific types to avoid conflicts
pub use admin::{Column as AdminColumn, Entity as Admin, Model as AdminModel};
pub use merchant::{Column as MerchantColumn, Entity as Merchant, Model as MerchantModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use user_query::{Column as UserQueryColumn, Entity as UserQuery, Model as UserQueryModel};
