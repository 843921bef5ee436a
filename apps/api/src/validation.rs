//! Small helpers shared by the request schemas.

use crate::errors::FieldErrors;

/// Longest value accepted for the `VARCHAR(255)` columns.
pub const MAX_TEXT_LEN: usize = 255;

/// Records `message` against `field`.
pub fn push_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

/// Returns the trimmed value when present and non-blank.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Postgres counts `VARCHAR` length in characters, not bytes.
pub fn too_long(value: &str) -> bool {
    value.chars().count() > MAX_TEXT_LEN
}

pub fn too_long_message(label: &str) -> String {
    format!("{label} must be at most {MAX_TEXT_LEN} characters.")
}

/// Cheap structural check: one `@`, non-empty local part, dotted domain, no whitespace.
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Emails are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
