use super::error::AuthError;
use super::models::RoleName;
use super::repository::UserRepository;
use std::sync::Arc;
use tracing::info;

/// Who is asking to create an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requester {
    Anonymous,
    Authenticated(String),
}

impl Requester {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Requester::Anonymous => None,
            Requester::Authenticated(id) => Some(id),
        }
    }
}

/// How an account creation was allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// The requester's own standing permits it
    Requester,
    /// First admin on a store with no admins; the store must still confirm
    /// this caller is the only one to claim it
    Bootstrap,
}

/// Decides which requesters may create accounts of which tier
pub struct RolePolicy {
    user_repo: Arc<dyn UserRepository>,
}

impl RolePolicy {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    pub async fn can_create(
        &self,
        tier: RoleName,
        requester: &Requester,
    ) -> Result<Grant, AuthError> {
        match tier {
            RoleName::User => Ok(Grant::Requester),
            RoleName::Manager => {
                self.require_admin(requester, "Only admins can create managers")
                    .await
            }
            RoleName::Admin => {
                if !self.user_repo.exists_with_role(RoleName::Admin).await? {
                    info!("no admin exists yet, allowing bootstrap admin creation");
                    return Ok(Grant::Bootstrap);
                }
                self.require_admin(requester, "Only admins can create admins")
                    .await
            }
        }
    }

    /// The requester must be signed in and their stored record must hold `admin`
    async fn require_admin(&self, requester: &Requester, denial: &str) -> Result<Grant, AuthError> {
        let user_id = requester.user_id().ok_or(AuthError::Unauthorized)?;

        match self.user_repo.find_by_id(user_id).await? {
            Some(user) if user.has_role(RoleName::Admin) => Ok(Grant::Requester),
            _ => Err(AuthError::Forbidden(denial.to_string())),
        }
    }
}
