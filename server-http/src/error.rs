use crate::api::ErrorResponse;
use axum::{
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use pulsevote::auth::AuthError;
use tracing::error;

const RATELIMIT_LIMIT: &str = "ratelimit-limit";
const RATELIMIT_REMAINING: &str = "ratelimit-remaining";
const RATELIMIT_RESET: &str = "ratelimit-reset";

/// HTTP rendering of a domain error
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            // Duplicate email stays 400 for compatibility with the existing client
            AuthError::Validation(_)
            | AuthError::EmailAlreadyExists
            | AuthError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AuthError::Unauthorized | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AuthError::StorageError(_)
            | AuthError::SerializationError(_)
            | AuthError::PasswordHashError(_)
            | AuthError::TokenError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self.0 {
            AuthError::Validation(errors) => {
                (status, Json(ErrorResponse::with_errors("Invalid input", errors))).into_response()
            }
            AuthError::RateLimited {
                message,
                limit,
                retry_after_secs,
            } => (
                status,
                [
                    (header::RETRY_AFTER, retry_after_secs.to_string()),
                    (HeaderName::from_static(RATELIMIT_LIMIT), limit.to_string()),
                    (HeaderName::from_static(RATELIMIT_REMAINING), "0".to_string()),
                    (HeaderName::from_static(RATELIMIT_RESET), retry_after_secs.to_string()),
                ],
                Json(ErrorResponse::new(message)),
            )
                .into_response(),
            err @ (AuthError::Unauthorized | AuthError::InvalidToken) => {
                let mut response = (status, Json(ErrorResponse::new(err.to_string()))).into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            err if err.is_internal() => {
                error!("request failed: {}", err);
                (status, Json(ErrorResponse::new("Server error"))).into_response()
            }
            err => (status, Json(ErrorResponse::new(err.to_string()))).into_response(),
        }
    }
}
