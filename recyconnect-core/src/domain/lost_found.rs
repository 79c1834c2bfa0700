//! Lost-and-found report status rules.

/// Status a new report gets when none is supplied
pub const DEFAULT_STATUS: &str = "active";

/// Stored status meaning the item has been returned
pub const RESOLVED_STATUS: &str = "resolved";

/// Status change derived from a status requested by a client.
///
/// Clients use `verified` for a report an admin has checked; it is stored
/// as `active`. `resolved` also flips the resolved flag. Anything else is
/// stored as given and leaves the report unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedStatusUpdate {
    pub status: String,
    pub is_resolved: bool,
}

impl ReportedStatusUpdate {
    pub fn from_requested(requested: &str) -> Self {
        match requested {
            "verified" => Self {
                status: DEFAULT_STATUS.to_string(),
                is_resolved: false,
            },
            RESOLVED_STATUS => Self {
                status: RESOLVED_STATUS.to_string(),
                is_resolved: true,
            },
            other => Self {
                status: other.to_string(),
                is_resolved: false,
            },
        }
    }
}

/// Status for a new report: the requested one unless blank.
pub fn initial_status(requested: Option<&str>) -> String {
    match requested.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => DEFAULT_STATUS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verified_maps_to_active() {
        let update = ReportedStatusUpdate::from_requested("verified");
        assert_eq!(update.status, "active");
        assert!(!update.is_resolved);
    }

    #[test]
    fn resolved_sets_flag() {
        let update = ReportedStatusUpdate::from_requested("resolved");
        assert_eq!(update.status, "resolved");
        assert!(update.is_resolved);
    }

    #[test]
    fn other_values_pass_through_unresolved() {
        let update = ReportedStatusUpdate::from_requested("pending");
        assert_eq!(update.status, "pending");
        assert!(!update.is_resolved);

        // matching is exact
        let update = ReportedStatusUpdate::from_requested("RESOLVED");
        assert_eq!(update.status, "RESOLVED");
        assert!(!update.is_resolved);
    }

    #[test]
    fn initial_status_defaults_when_blank() {
        assert_eq!(initial_status(None), "active");
        assert_eq!(initial_status(Some("  ")), "active");
        assert_eq!(initial_status(Some("found")), "found");
    }
}
