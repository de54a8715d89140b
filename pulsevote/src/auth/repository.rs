use super::error::AuthError;
use super::models::{RoleName, User};
use async_trait::async_trait;

/// Credential store consulted by the auth service.
///
/// Emails are stored already normalized; implementations compare them verbatim.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user, failing with `EmailAlreadyExists` if the email is taken
    async fn create(&self, user: User) -> Result<User, AuthError>;

    /// Create the first admin account.
    ///
    /// At most one call ever claims the bootstrap; every other caller fails
    /// with `Unauthorized`, even if its own write would have succeeded.
    async fn create_bootstrap_admin(&self, user: User) -> Result<User, AuthError>;

    /// Find a user by email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Find a user by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AuthError>;

    /// Check if any user holds the given role
    async fn exists_with_role(&self, role: RoleName) -> Result<bool, AuthError>;
}
