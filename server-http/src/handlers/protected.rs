use crate::api::{ProtectedResponse, ProtectedUser};
use crate::middleware::AuthenticatedUser;
use axum::{Extension, Json};
use chrono::Utc;

/// GET /api/protected
///
/// Smoke endpoint for any authenticated caller.
pub async fn protected(
    Extension(current_user): Extension<AuthenticatedUser>,
) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        message: format!(
            "Welcome, user {}! You have accessed protected data.",
            current_user.id
        ),
        user: ProtectedUser {
            id: current_user.id,
        },
        timestamp: Utc::now(),
    })
}
