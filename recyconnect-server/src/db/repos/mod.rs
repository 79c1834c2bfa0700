//! Repository implementations for database access
//!
//! Each repository borrows the pool and exposes one method per query the
//! handlers need. Display names (owner, donor, flagger) come from JOINs.

pub mod concerns;
pub mod donated;
pub mod flags;
pub mod images;
pub mod items;
pub mod messages;
pub mod reported;
pub mod stats;
pub mod users;

pub use concerns::{ConcernDetails, ConcernRepo, UserConcern};
pub use donated::{DonatedItem, DonatedRepo, DonationFields};
pub use flags::{Flag, FlagCounts, FlagQuery, FlagRepo, FlagUpdate, NewFlag};
pub use images::{ImageRepo, ItemImage, NewItemImage};
pub use items::{Item, ItemDetails, ItemFilter, ItemListing, ItemRepo};
pub use messages::{Message, MessageFilter, MessageRepo, NewMessage};
pub use reported::{ReportDetails, ReportedItem, ReportedRepo, ReportFields};
pub use stats::{DashboardStats, StatsRepo};
pub use users::{NewUser, User, UserChanges, UserRepo};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),
}

impl DbError {
    pub(crate) fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Map a unique-constraint violation on write to `Conflict`.
    pub(crate) fn on_write(err: sqlx::Error, conflict: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(conflict.to_owned())
            }
            _ => Self::Sqlx(err),
        }
    }
}
