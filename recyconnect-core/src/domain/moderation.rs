//! Moderation flag rules: severity, review status, and target kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How urgently a flag needs review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Severity implied by a flag reason. Unknown reasons are LOW.
    pub fn from_reason(reason: &str) -> Self {
        match reason.trim().to_ascii_uppercase().as_str() {
            "FRAUD" | "HARASSMENT" => Self::Critical,
            "INAPPROPRIATE" | "SPAM" => Self::High,
            "MISLEADING" => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Review order, 1 first.
    pub fn priority(self) -> u8 {
        match self {
            Self::Critical => 1,
            Self::High => 2,
            Self::Medium => 3,
            Self::Low => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(UnknownVariant(s.to_owned())),
        }
    }
}

/// Review state of a flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlagStatus {
    #[default]
    Pending,
    Reviewed,
    Resolved,
    Dismissed,
}

impl FlagStatus {
    /// RESOLVED and DISMISSED end the review and stamp `resolved_at`.
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Resolved | Self::Dismissed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Reviewed => "REVIEWED",
            Self::Resolved => "RESOLVED",
            Self::Dismissed => "DISMISSED",
        }
    }
}

impl fmt::Display for FlagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlagStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "REVIEWED" => Ok(Self::Reviewed),
            "RESOLVED" => Ok(Self::Resolved),
            "DISMISSED" => Ok(Self::Dismissed),
            _ => Err(UnknownVariant(s.to_owned())),
        }
    }
}

/// A string that names no known variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// What a flag's `target_type` points at, for context lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagTarget {
    DonatedItem,
    ReportedItem,
    User,
    Other,
}

impl FlagTarget {
    pub fn classify(target_type: &str) -> Self {
        match target_type.trim().to_ascii_lowercase().as_str() {
            "item" | "donated_item" => Self::DonatedItem,
            "reported_item" | "lost_item" | "found_item" => Self::ReportedItem,
            "user" => Self::User,
            _ => Self::Other,
        }
    }
}

pub const UNKNOWN_ITEM: &str = "Unknown Item";
pub const UNKNOWN_USER: &str = "Unknown User";
pub const UNKNOWN_CONTENT: &str = "Unknown Content";
pub const CONTENT_NOT_FOUND: &str = "Content Not Found";

/// Context line stored with a flag describing a flagged user
pub fn user_context(name: &str, email: &str) -> String {
    format!("{name} ({email})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_from_reason_table() {
        assert_eq!(Severity::from_reason("FRAUD"), Severity::Critical);
        assert_eq!(Severity::from_reason("harassment"), Severity::Critical);
        assert_eq!(Severity::from_reason("Inappropriate"), Severity::High);
        assert_eq!(Severity::from_reason("SPAM"), Severity::High);
        assert_eq!(Severity::from_reason("misleading"), Severity::Medium);
        assert_eq!(Severity::from_reason("OTHER"), Severity::Low);
        assert_eq!(Severity::from_reason("something new"), Severity::Low);
    }

    #[test]
    fn priority_orders_critical_first() {
        let mut all = vec![
            Severity::Low,
            Severity::Critical,
            Severity::Medium,
            Severity::High,
        ];
        all.sort_by_key(|s| s.priority());
        assert_eq!(
            all,
            vec![
                Severity::Critical,
                Severity::High,
                Severity::Medium,
                Severity::Low
            ]
        );
    }

    #[test]
    fn defaults_match_new_flags() {
        assert_eq!(Severity::default(), Severity::Medium);
        assert_eq!(FlagStatus::default(), FlagStatus::Pending);
    }

    #[test]
    fn closed_statuses() {
        assert!(FlagStatus::Resolved.is_closed());
        assert!(FlagStatus::Dismissed.is_closed());
        assert!(!FlagStatus::Pending.is_closed());
        assert!(!FlagStatus::Reviewed.is_closed());
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("resolved".parse::<FlagStatus>(), Ok(FlagStatus::Resolved));
        assert_eq!(" high ".parse::<Severity>(), Ok(Severity::High));
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn target_classification() {
        assert_eq!(FlagTarget::classify("item"), FlagTarget::DonatedItem);
        assert_eq!(FlagTarget::classify("DONATED_ITEM"), FlagTarget::DonatedItem);
        assert_eq!(FlagTarget::classify("lost_item"), FlagTarget::ReportedItem);
        assert_eq!(FlagTarget::classify("found_item"), FlagTarget::ReportedItem);
        assert_eq!(FlagTarget::classify("reported_item"), FlagTarget::ReportedItem);
        assert_eq!(FlagTarget::classify("User"), FlagTarget::User);
        assert_eq!(FlagTarget::classify("message"), FlagTarget::Other);
    }

    #[test]
    fn user_context_format() {
        assert_eq!(user_context("Asha", "asha@uni.edu"), "Asha (asha@uni.edu)");
    }
}
