//! Field checks shared by the services. Limits mirror the column sizes the
//! frontend was built against.

use crate::error::{CoreError, Result};

pub const NAME_MAX: usize = 100;
pub const EMAIL_MAX: usize = 150;
pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 100;
pub const TITLE_MAX: usize = 200;
pub const DESCRIPTION_MAX: usize = 1000;
pub const LOCATION_MAX: usize = 500;
pub const JUSTIFICATION_MAX: usize = 500;
pub const MESSAGE_MAX: usize = 5000;
pub const URL_MAX: usize = 1000;

/// Trimmed, non-empty, at most `max` characters.
pub fn required(field: &str, value: &str, max: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::invalid(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(CoreError::invalid(format!("{field} must be at most {max} characters")));
    }
    Ok(value.to_string())
}

/// Blank input collapses to `None`.
pub fn optional(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if v.chars().count() > max => Err(CoreError::invalid(format!(
            "{field} must be at most {max} characters"
        ))),
        Some(v) => Ok(Some(v.to_string())),
        None => Ok(None),
    }
}

/// Lowercased and trimmed; must look like `local@domain`.
pub fn email(value: &str) -> Result<String> {
    let email = value.trim().to_lowercase();
    if email.is_empty() {
        return Err(CoreError::invalid("email is required"));
    }
    if email.chars().count() > EMAIL_MAX {
        return Err(CoreError::invalid(format!("email must be at most {EMAIL_MAX} characters")));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email)
        }
        _ => Err(CoreError::invalid("email must be a valid address")),
    }
}

pub fn password(value: &str) -> Result<()> {
    let len = value.chars().count();
    if value.trim().is_empty() || !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        return Err(CoreError::invalid(format!(
            "password must be between {PASSWORD_MIN} and {PASSWORD_MAX} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(email("  Maria@Example.COM ").unwrap(), "maria@example.com");
        assert!(email("no-at-sign").is_err());
        assert!(email("@example.com").is_err());
        assert!(email("a@b@c").is_err());
    }

    #[test]
    fn optional_blank_is_none() {
        assert_eq!(optional("location", Some("   "), 10).unwrap(), None);
        assert!(optional("location", Some("x".repeat(11).as_str()), 10).is_err());
    }

    #[test]
    fn password_length_bounds() {
        assert!(password("12345").is_err());
        assert!(password("123456").is_ok());
        assert!(password(&"x".repeat(101)).is_err());
    }
}
