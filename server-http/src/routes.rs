use crate::handlers;
use crate::middleware::{auth_middleware, optional_auth_middleware, role_layer};
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use pulsevote::auth::RoleName;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Routes mounted under /api/auth
fn auth_routes(state: &AppState) -> Router<AppState> {
    // Layers wrap outward: authentication runs first, then the admin-role check
    let manager = Router::new()
        .route("/register-manager", post(handlers::register_manager))
        .route_layer(from_fn_with_state(state.clone(), role_layer(RoleName::Admin)))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let admin = Router::new()
        .route("/register-admin", post(handlers::register_admin))
        .route_layer(from_fn_with_state(state.clone(), optional_auth_middleware));

    Router::new()
        .route("/register-user", post(handlers::register_user))
        .route("/login", post(handlers::login))
        .merge(manager)
        .merge(admin)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Build and configure the application router
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let protected = Router::new()
        .route("/api/protected", get(handlers::protected))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/test", get(handlers::service_status))
        .nest("/api/auth", auth_routes(&state))
        .merge(protected)
        // Middleware
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
