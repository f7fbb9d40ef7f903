use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

use crate::error::{OutreachError, Result};

/// Input validation for identity reservation and outreach drafts

// These patterns are hardcoded and always valid, so we use expect() with explicit reasoning
static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9._-]{3,64}$")
        .expect("hardcoded username regex is invalid - fix source code")
});

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("hardcoded email regex is invalid - fix source code")
});

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 64;
pub const DISPLAY_NAME_MAX_LEN: usize = 128;

/// Validate username shape (3-64 chars of lowercase letters, digits, `.`, `_`, `-`)
pub fn validate_username(username: &str) -> bool {
    USERNAME_REGEX.is_match(username)
}

/// Like [`validate_username`] but explains the first violated rule
pub fn check_username(username: &str) -> Result<()> {
    if validate_username(username) {
        return Ok(());
    }

    let len = username.chars().count();
    let reason = if len < USERNAME_MIN_LEN {
        format!("must be at least {} characters", USERNAME_MIN_LEN)
    } else if len > USERNAME_MAX_LEN {
        format!("must be at most {} characters", USERNAME_MAX_LEN)
    } else if username.chars().any(|c| c.is_ascii_uppercase()) {
        "must be lowercase".to_string()
    } else {
        "may only contain lowercase letters, digits, '.', '_' and '-'".to_string()
    };

    Err(OutreachError::InvalidUsername(reason))
}

/// validator crate compatible custom validator for username shape
pub fn validate_username_shape_validator(username: &str) -> std::result::Result<(), ValidationError> {
    if validate_username(username) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username"))
    }
}

/// Trim and check a display name, returning the normalized value
pub fn normalize_display_name(display_name: &str) -> Result<String> {
    let trimmed = display_name.trim();
    if trimmed.is_empty() {
        return Err(OutreachError::InvalidDisplayName(
            "must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > DISPLAY_NAME_MAX_LEN {
        return Err(OutreachError::InvalidDisplayName(format!(
            "must be at most {} characters",
            DISPLAY_NAME_MAX_LEN
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(OutreachError::InvalidDisplayName(
            "must not contain control characters".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Validate email format (RFC 5322 simplified)
pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

/// Draft preconditions checked before any remote call
pub fn check_draft_fields(subject: &str, body: &str, recipient_count: usize) -> Result<()> {
    if recipient_count == 0 {
        return Err(OutreachError::Validation(
            "at least one recipient must be selected".to_string(),
        ));
    }
    if subject.trim().is_empty() {
        return Err(OutreachError::Validation("subject must not be empty".to_string()));
    }
    if body.trim().is_empty() {
        return Err(OutreachError::Validation("body must not be empty".to_string()));
    }
    Ok(())
}
