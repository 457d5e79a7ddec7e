//! Core module - Framework-agnostic business logic.
//! Catalog and merchant CRUD, role resolution, the search pipeline and its
//! language-model steps, and the session state machine.

pub mod best_effort;
pub mod description;
pub mod merchant;
pub mod preference;
pub mod product;
pub mod query_log;
pub mod role;
pub mod search;
pub mod search_query;
pub mod search_state;
pub mod session;
