use crate::api::{RegisteredResponse, TokenResponse};
use crate::client::ClientAddr;
use crate::error::ApiError;
use crate::middleware::{AuthenticatedUser, MaybeAuthenticated};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use pulsevote::auth::{AuthToken, LoginRequest, RegistrationRequest, Requester};
use tracing::info;

type Body<T> = Result<Json<T>, JsonRejection>;

/// An unparsable body is treated as empty so it still passes through the
/// rate limiter and is rejected by field validation
fn parse<T: Default>(body: Body<T>) -> T {
    body.map(|Json(inner)| inner).unwrap_or_else(|rejection| {
        info!("unparsable request body: {}", rejection.body_text());
        T::default()
    })
}

fn registered(message: &str, issued: AuthToken) -> (StatusCode, Json<RegisteredResponse>) {
    (
        StatusCode::CREATED,
        Json(RegisteredResponse {
            message: message.to_string(),
            token: issued.token,
        }),
    )
}

/// POST /api/auth/register-user
///
/// Open self-registration as a plain user.
pub async fn register_user(
    State(state): State<AppState>,
    client: ClientAddr,
    body: Body<RegistrationRequest>,
) -> Result<(StatusCode, Json<RegisteredResponse>), ApiError> {
    let request = parse(body);

    let issued = state
        .auth_service
        .register_user(request, client.as_str())
        .await?;

    Ok(registered("User registered", issued))
}

/// POST /api/auth/register-manager
///
/// Runs behind the authentication and admin-role gates.
pub async fn register_manager(
    State(state): State<AppState>,
    Extension(current_user): Extension<AuthenticatedUser>,
    client: ClientAddr,
    body: Body<RegistrationRequest>,
) -> Result<(StatusCode, Json<RegisteredResponse>), ApiError> {
    let request = parse(body);

    info!(
        "REGISTER_MANAGER: email={}, requested_by={}",
        request.email, current_user.email
    );

    let issued = state
        .auth_service
        .register_manager(request, &current_user.requester(), client.as_str())
        .await?;

    Ok(registered("Manager registered", issued))
}

/// POST /api/auth/register-admin
///
/// Anonymous while no admin exists; afterwards requires an admin bearer token.
pub async fn register_admin(
    State(state): State<AppState>,
    identity: MaybeAuthenticated,
    client: ClientAddr,
    body: Body<RegistrationRequest>,
) -> Result<(StatusCode, Json<RegisteredResponse>), ApiError> {
    let request = parse(body);
    let requester = identity.requester();

    if let Requester::Authenticated(id) = &requester {
        info!("REGISTER_ADMIN: email={}, requested_by={}", request.email, id);
    }

    let issued = state
        .auth_service
        .register_admin(request, &requester, client.as_str())
        .await?;

    Ok(registered("Admin registered", issued))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    client: ClientAddr,
    body: Body<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let request = parse(body);

    let issued = state.auth_service.login(request, client.as_str()).await?;

    Ok(Json(TokenResponse {
        token: issued.token,
    }))
}
