//! Database layer - connection pool, schema and repositories
//!
//! - Connection pool, shared by every handler through `AppState`
//! - List operations JOIN the user table for display names (no N+1)
//! - Uniqueness is enforced by constraints; violations surface as `DbError::Conflict`

pub mod pool;
pub mod repos;
pub mod schema;

pub use pool::{create_pool, create_pool_with_options};
pub use repos::*;
