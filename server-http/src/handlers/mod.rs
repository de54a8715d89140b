pub mod auth;
pub mod health;
pub mod protected;

pub use auth::{login, register_admin, register_manager, register_user};
pub use health::{health_check, root, service_status};
pub use protected::protected;
