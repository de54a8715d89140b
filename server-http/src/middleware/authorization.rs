use super::authentication::get_authenticated_user;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use pulsevote::auth::{AuthError, RoleName};
use tracing::warn;

/// Check that the authenticated user's stored record holds `role`.
///
/// Must run inside `auth_middleware`; a request without an identity is 401.
pub async fn require_role(
    role: RoleName,
    state: AppState,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = get_authenticated_user(&request)
        .map(|user| user.id.clone())
        .ok_or(AuthError::Unauthorized)?;

    if let Err(e) = state.auth_service.require_role(&user_id, role).await {
        warn!(user_id = %user_id, role = %role, "role check failed: {}", e);
        return Err(e.into());
    }

    Ok(next.run(request).await)
}

/// Middleware factory for requiring a specific role
pub fn role_layer(
    role: RoleName,
) -> impl Fn(
    State<AppState>,
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>>
       + Clone {
    move |State(state): State<AppState>, request: Request, next: Next| {
        Box::pin(async move {
            require_role(role, state, request, next)
                .await
                .into_response()
        })
    }
}
