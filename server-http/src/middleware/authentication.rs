use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use pulsevote::auth::{AuthError, Requester};
use std::convert::Infallible;

/// Identity attached to a request once its bearer token has been verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
}

impl AuthenticatedUser {
    pub fn requester(&self) -> Requester {
        Requester::Authenticated(self.id.clone())
    }
}

/// Extract Bearer token from Authorization header
fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    // Authorization: Bearer <token>
    let mut parts = auth_header.split_whitespace();

    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("Bearer") => Some(token),
        _ => None,
    }
}

/// Verify the request's bearer token, if it carries one.
///
/// `Ok(None)` means no Authorization header at all.
fn identify(state: &AppState, request: &Request) -> Result<Option<AuthenticatedUser>, AuthError> {
    let Some(auth_header) = request.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = auth_header
        .to_str()
        .ok()
        .and_then(extract_bearer_token)
        .ok_or(AuthError::InvalidToken)?;

    let claims = state.auth_service.authenticate(token)?;

    Ok(Some(AuthenticatedUser {
        id: claims.sub,
        email: claims.email,
    }))
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = identify(&state, &request)?.ok_or(AuthError::Unauthorized)?;

    // Attach user to request extensions
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Attach the caller's identity when a valid token is present, otherwise pass through
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Ok(Some(user)) = identify(&state, &request) {
        request.extensions_mut().insert(user);
    }

    next.run(request).await
}

/// Identity set by `optional_auth_middleware`, if any
#[derive(Debug, Clone)]
pub struct MaybeAuthenticated(pub Option<AuthenticatedUser>);

impl MaybeAuthenticated {
    pub fn requester(&self) -> Requester {
        self.0
            .as_ref()
            .map(AuthenticatedUser::requester)
            .unwrap_or(Requester::Anonymous)
    }
}

impl<S> FromRequestParts<S> for MaybeAuthenticated
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthenticated(
            parts.extensions.get::<AuthenticatedUser>().cloned(),
        ))
    }
}

/// Extract authenticated user from request extensions
pub fn get_authenticated_user(request: &Request) -> Option<&AuthenticatedUser> {
    request.extensions().get::<AuthenticatedUser>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123def456"), Some("abc123def456"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));

        // Invalid format
        assert!(extract_bearer_token("Basic dXNlcjpwYXNz").is_none());
        assert!(extract_bearer_token("Bearer").is_none());
        assert!(extract_bearer_token("Bearer a b").is_none());
        assert!(extract_bearer_token("abc123").is_none());
    }

    #[test]
    fn test_maybe_authenticated_requester() {
        assert_eq!(MaybeAuthenticated(None).requester(), Requester::Anonymous);

        let user = AuthenticatedUser {
            id: "user-1".to_string(),
            email: "a@example.com".to_string(),
        };
        assert_eq!(
            MaybeAuthenticated(Some(user)).requester(),
            Requester::Authenticated("user-1".to_string())
        );
    }
}
