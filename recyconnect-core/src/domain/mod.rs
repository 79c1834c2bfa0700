//! Business rules shared by the HTTP layer and repositories.
//!
//! Everything here is pure: no I/O, no database.

pub mod accounts;
pub mod lost_found;
pub mod moderation;

pub use accounts::{
    generate_college_id, hash_password, hash_password_with_cost, verify_password, UserRole,
};
pub use lost_found::ReportedStatusUpdate;
pub use moderation::{FlagStatus, FlagTarget, Severity, UnknownVariant};

/// Pickup location shown when neither the update nor the record has one
pub const UNSPECIFIED_LOCATION: &str = "Not specified";

/// Contact method recorded for concerns submitted without one
pub const DEFAULT_CONTACT_METHOD: &str = "email";

/// Status of a newly submitted concern
pub const DEFAULT_CONCERN_STATUS: &str = "pending";

/// Status that closes a concern
pub const CONCERN_RESOLVED: &str = "resolved";

/// Pickup location for an updated donation.
///
/// The requested value wins unless blank; then the existing one is kept;
/// then a placeholder.
pub fn pickup_location(requested: Option<&str>, existing: Option<&str>) -> String {
    [requested, existing]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(UNSPECIFIED_LOCATION)
        .to_string()
}

/// Returns the value when it has non-whitespace content.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pickup_location_fallbacks() {
        assert_eq!(pickup_location(Some("Library"), Some("Gate")), "Library");
        assert_eq!(pickup_location(Some("  "), Some("Gate")), "Gate");
        assert_eq!(pickup_location(None, Some("Gate")), "Gate");
        assert_eq!(pickup_location(None, Some("")), "Not specified");
        assert_eq!(pickup_location(None, None), "Not specified");
    }

    #[test]
    fn non_blank_filters_whitespace() {
        assert_eq!(non_blank(Some("x")), Some("x"));
        assert_eq!(non_blank(Some(" \t")), None);
        assert_eq!(non_blank(None), None);
    }
}
