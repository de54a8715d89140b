use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Privilege tiers an account can hold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    User,
    Manager,
    Admin,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::User => "user",
            RoleName::Manager => "manager",
            RoleName::Admin => "admin",
        }
    }
}

impl std::fmt::Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role held by a user, optionally scoped to an organisation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleAssignment {
    pub organisation_id: Option<String>,
    pub role: RoleName,
}

impl RoleAssignment {
    /// An assignment that is not scoped to any organisation
    pub fn global(role: RoleName) -> Self {
        Self {
            organisation_id: None,
            role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<RoleAssignment>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// New account holding a single global assignment for `role`
    pub fn new(email: String, password_hash: String, role: RoleName) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash,
            roles: vec![RoleAssignment::global(role)],
            created_at: Utc::now(),
        }
    }

    /// Whether any assignment, in any organisation, grants `role`
    pub fn has_role(&self, role: RoleName) -> bool {
        self.roles.iter().any(|r| r.role == role)
    }

    pub fn role_names(&self) -> Vec<RoleName> {
        self.roles.iter().map(|r| r.role).collect()
    }
}
