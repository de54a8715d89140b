use super::error::AuthError;
use super::models::{RoleName, User};
use super::repository::UserRepository;
use async_trait::async_trait;
use sled::Db;
use std::path::Path;
use tracing::warn;

const USERS_TREE: &str = "users";
const USERS_BY_EMAIL_TREE: &str = "users_by_email";
const META_TREE: &str = "meta";
const BOOTSTRAP_ADMIN_KEY: &[u8] = b"bootstrap_admin";

#[derive(Clone)]
pub struct SledUserRepository {
    db: Db,
}

impl SledUserRepository {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, AuthError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn users_tree(&self) -> Result<sled::Tree, AuthError> {
        Ok(self.db.open_tree(USERS_TREE)?)
    }

    fn users_by_email_tree(&self) -> Result<sled::Tree, AuthError> {
        Ok(self.db.open_tree(USERS_BY_EMAIL_TREE)?)
    }

    fn meta_tree(&self) -> Result<sled::Tree, AuthError> {
        Ok(self.db.open_tree(META_TREE)?)
    }
}

#[async_trait]
impl UserRepository for SledUserRepository {
    async fn create(&self, user: User) -> Result<User, AuthError> {
        let users_tree = self.users_tree()?;
        let email_tree = self.users_by_email_tree()?;

        let user_json = serde_json::to_vec(&user)?;

        // Reserve the email first; the swap only succeeds if no one holds it
        let reserved = email_tree.compare_and_swap(
            user.email.as_bytes(),
            None as Option<&[u8]>,
            Some(user.id.as_bytes()),
        )?;
        if reserved.is_err() {
            return Err(AuthError::EmailAlreadyExists);
        }

        if let Err(e) = users_tree.insert(user.id.as_bytes(), user_json) {
            // Release the reservation so the email is not orphaned
            email_tree.remove(user.email.as_bytes())?;
            return Err(e.into());
        }

        Ok(user)
    }

    async fn create_bootstrap_admin(&self, user: User) -> Result<User, AuthError> {
        let meta_tree = self.meta_tree()?;

        // Only the first swap on the marker wins the bootstrap
        let claimed = meta_tree.compare_and_swap(
            BOOTSTRAP_ADMIN_KEY,
            None as Option<&[u8]>,
            Some(user.id.as_bytes()),
        )?;
        if claimed.is_err() {
            warn!(email = %user.email, "bootstrap admin already claimed");
            return Err(AuthError::Unauthorized);
        }

        match self.create(user).await {
            Ok(user) => Ok(user),
            Err(e) => {
                // Nothing was written, so the bootstrap is still open
                meta_tree.remove(BOOTSTRAP_ADMIN_KEY)?;
                Err(e)
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let email_tree = self.users_by_email_tree()?;
        let users_tree = self.users_tree()?;

        // First, get the user ID from email index
        if let Some(user_id) = email_tree.get(email.as_bytes())? {
            // Then get the user by ID
            if let Some(user_data) = users_tree.get(&user_id)? {
                let user: User = serde_json::from_slice(&user_data)?;
                return Ok(Some(user));
            }
        }

        Ok(None)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AuthError> {
        let users_tree = self.users_tree()?;

        if let Some(user_data) = users_tree.get(id.as_bytes())? {
            let user: User = serde_json::from_slice(&user_data)?;
            return Ok(Some(user));
        }

        Ok(None)
    }

    async fn exists_with_role(&self, role: RoleName) -> Result<bool, AuthError> {
        let users_tree = self.users_tree()?;

        for item in users_tree.iter() {
            let (_, user_data) = item?;
            let user: User = serde_json::from_slice(&user_data)?;
            if user.has_role(role) {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
