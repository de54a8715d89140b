pub mod authentication;
pub mod authorization;

pub use authentication::{
    auth_middleware, optional_auth_middleware, AuthenticatedUser, MaybeAuthenticated,
};
pub use authorization::role_layer;
