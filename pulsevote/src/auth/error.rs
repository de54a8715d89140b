use serde::Serialize;
use thiserror::Error;

/// A single rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    pub fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid input")]
    Validation(Vec<FieldError>),

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("User not authenticated")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    RateLimited {
        message: &'static str,
        limit: u32,
        retry_after_secs: u64,
    },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Password hashing error: {0}")]
    PasswordHashError(String),

    #[error("Token signing error: {0}")]
    TokenError(String),
}

impl AuthError {
    /// True for failures caused by the server rather than the request
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::StorageError(_)
                | AuthError::SerializationError(_)
                | AuthError::PasswordHashError(_)
                | AuthError::TokenError(_)
        )
    }
}

impl From<sled::Error> for AuthError {
    fn from(err: sled::Error) -> Self {
        AuthError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::SerializationError(err.to_string())
    }
}
