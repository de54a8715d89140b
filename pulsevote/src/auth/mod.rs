// Public API
pub mod auth_service;
pub mod error;
pub mod models;
pub mod password;
pub mod policy;
pub mod rate_limit;
pub mod repository;
pub mod sled_repository;
pub mod token;
pub mod validation;

// Re-export commonly used types
pub use auth_service::{AuthService, AuthToken, LoginRequest, RegistrationRequest};
pub use error::{AuthError, FieldError};
pub use models::{RoleAssignment, RoleName, User};
pub use policy::{Grant, Requester, RolePolicy};
pub use rate_limit::{RateLimitExceeded, RateLimitPolicy, RateLimiters, SlidingWindowLimiter};
pub use repository::UserRepository;
pub use sled_repository::SledUserRepository;
pub use token::{Claims, TokenIssuer};
