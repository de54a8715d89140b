use super::error::{AuthError, FieldError};
use regex::Regex;
use std::sync::LazyLock;

const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.[a-z]{2,}$")
        .expect("email pattern is valid")
});

/// Trim and lowercase an email so lookups are case-insensitive
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(normalized: &str, errors: &mut Vec<FieldError>) {
    if !EMAIL_RE.is_match(normalized) {
        errors.push(FieldError::new("email", "Email must be valid"));
    }
}

fn check_strong_password(password: &str, errors: &mut Vec<FieldError>) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 8 characters",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        errors.push(FieldError::new("password", "Password must include a letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(FieldError::new("password", "Password must include a number"));
    }
}

/// Validate registration input, returning the normalized email
pub fn validate_registration(email: &str, password: &str) -> Result<String, AuthError> {
    let normalized = normalize_email(email);
    let mut errors = Vec::new();

    check_email(&normalized, &mut errors);
    check_strong_password(password, &mut errors);

    if errors.is_empty() {
        Ok(normalized)
    } else {
        Err(AuthError::Validation(errors))
    }
}

/// Validate login input, returning the normalized email
pub fn validate_login(email: &str, password: &str) -> Result<String, AuthError> {
    let normalized = normalize_email(email);
    let mut errors = Vec::new();

    check_email(&normalized, &mut errors);
    if password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }

    if errors.is_empty() {
        Ok(normalized)
    } else {
        Err(AuthError::Validation(errors))
    }
}
