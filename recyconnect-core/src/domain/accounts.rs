//! User account rules: roles, college ids and password hashing.

use chrono::Datelike;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Account role. Stored as upper-case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    #[default]
    User,
    Admin,
    /// Soft-deleted account, excluded from dashboard counts
    Deleted,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
            Self::Deleted => "DELETED",
        }
    }
}

/// College id of the form `CTU<year><4 digits>`
pub fn college_id(year: i32, serial: u16) -> String {
    format!("CTU{year}{serial}")
}

/// Random college id for the current year
pub fn generate_college_id() -> String {
    let year = chrono::Utc::now().year();
    let serial = rand::thread_rng().gen_range(1000..=9999);
    college_id(year, serial)
}

/// bcrypt work factor for new hashes
pub const HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// Hash a password with bcrypt at [`HASH_COST`].
pub fn hash_password(password: &str) -> Result<String> {
    hash_password_with_cost(password, HASH_COST)
}

pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Check a password against a stored bcrypt hash (`$2a$`, `$2b$` or `$2y$`).
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    Ok(bcrypt::verify(password, stored)?)
}
