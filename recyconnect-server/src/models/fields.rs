//! Validated text fields

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

/// Column limit for item and report descriptions
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Column limit for concern descriptions
pub const MAX_CONCERN_LEN: usize = 2000;

/// Column limit for flag descriptions and admin notes
pub const MAX_NOTES_LEN: usize = 1000;

/// Loose shape check: something@something.tld, no whitespace
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email regex"));

/// Text that must be present and non-blank.
///
/// # Example
/// ```
/// use recyconnect_server::models::required_text;
///
/// assert!(required_text("title", Some("Desk lamp"), None).is_ok());
/// assert!(required_text("title", Some("  "), None).is_err());
/// assert!(required_text("title", None, None).is_err());
/// ```
pub fn required_text(
    field: &'static str,
    value: Option<&str>,
    max: Option<usize>,
) -> Result<String, ValidationError> {
    let value = value.ok_or(ValidationError::Missing { field })?;
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if let Some(max) = max {
        check_len(field, value, max)?;
    }
    Ok(value.to_owned())
}

/// Optional text with a length limit.
pub fn bounded_text(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    if let Some(v) = &value {
        check_len(field, v, max)?;
    }
    Ok(value)
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Email address, trimmed and shape-checked.
pub fn email(value: Option<&str>) -> Result<String, ValidationError> {
    let value = required_text("email", value, Some(254))?;
    let value = value.trim();
    if !EMAIL_RE.is_match(value) {
        return Err(ValidationError::InvalidFormat {
            field: "email",
            reason: "must look like name@domain.tld",
        });
    }
    Ok(value.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_rules() {
        assert_eq!(required_text("title", Some("Lamp"), None).unwrap(), "Lamp");
        assert_eq!(
            required_text("title", None, None),
            Err(ValidationError::Missing { field: "title" })
        );
        assert_eq!(
            required_text("title", Some(""), None),
            Err(ValidationError::Empty { field: "title" })
        );
    }

    #[test]
    fn length_is_counted_in_chars() {
        let text = "é".repeat(MAX_DESCRIPTION_LEN);
        assert!(required_text("description", Some(&text), Some(MAX_DESCRIPTION_LEN)).is_ok());

        let text = "a".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(matches!(
            required_text("description", Some(&text), Some(MAX_DESCRIPTION_LEN)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn bounded_text_allows_none() {
        assert_eq!(bounded_text("notes", None, 10).unwrap(), None);
        assert!(bounded_text("notes", Some("x".repeat(11)), 10).is_err());
    }

    #[test]
    fn email_shape() {
        assert_eq!(email(Some(" a@b.edu ")).unwrap(), "a@b.edu");
        assert!(email(Some("not-an-email")).is_err());
        assert!(email(Some("a b@c.d")).is_err());
        assert!(email(None).is_err());
    }
}
