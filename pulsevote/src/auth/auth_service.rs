use super::error::AuthError;
use super::models::{RoleName, User};
use super::password::{hash_password, verify_password};
use super::policy::{Grant, Requester, RolePolicy};
use super::rate_limit::{RateLimitExceeded, RateLimiters};
use super::repository::UserRepository;
use super::token::{Claims, TokenIssuer};
use super::validation::{normalize_email, validate_login, validate_registration};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// A freshly issued bearer token and the account it belongs to
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub token: String,
    pub user: User,
}

pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    policy: RolePolicy,
    tokens: Arc<TokenIssuer>,
    limiters: Arc<RateLimiters>,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        tokens: Arc<TokenIssuer>,
        limiters: Arc<RateLimiters>,
    ) -> Self {
        Self {
            policy: RolePolicy::new(user_repo.clone()),
            user_repo,
            tokens,
            limiters,
        }
    }

    /// Create an account of the given tier and sign the new user in.
    ///
    /// Checks run strictly in order: rate limit, input validation, role
    /// authorization, email uniqueness. Nothing is written before all pass.
    pub async fn register(
        &self,
        tier: RoleName,
        request: RegistrationRequest,
        requester: &Requester,
        client: &str,
    ) -> Result<AuthToken, AuthError> {
        let key = RateLimiters::registration_key(client);
        self.limiters
            .registration
            .hit(&key)
            .map_err(|e| rate_limited("register", &key, e, RateLimiters::REGISTRATION_MESSAGE))?;

        let email = validate_registration(&request.email, &request.password)?;

        let grant = self.policy.can_create(tier, requester).await?;

        if self.user_repo.find_by_email(&email).await?.is_some() {
            info!(email = %email, tier = %tier, "registration rejected: email exists");
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = hash_password(&request.password)?;
        let new_user = User::new(email, password_hash, tier);
        let user = match grant {
            Grant::Bootstrap => self.user_repo.create_bootstrap_admin(new_user).await?,
            Grant::Requester => self.user_repo.create(new_user).await?,
        };

        let token = self.tokens.issue(&user)?;

        info!(
            user_id = %user.id,
            email = %user.email,
            tier = %tier,
            client,
            "account registered"
        );

        Ok(AuthToken { token, user })
    }

    pub async fn register_user(
        &self,
        request: RegistrationRequest,
        client: &str,
    ) -> Result<AuthToken, AuthError> {
        self.register(RoleName::User, request, &Requester::Anonymous, client)
            .await
    }

    pub async fn register_manager(
        &self,
        request: RegistrationRequest,
        requester: &Requester,
        client: &str,
    ) -> Result<AuthToken, AuthError> {
        self.register(RoleName::Manager, request, requester, client)
            .await
    }

    pub async fn register_admin(
        &self,
        request: RegistrationRequest,
        requester: &Requester,
        client: &str,
    ) -> Result<AuthToken, AuthError> {
        self.register(RoleName::Admin, request, requester, client)
            .await
    }

    /// Verify credentials and issue a token.
    ///
    /// Unknown emails and wrong passwords are indistinguishable. Each attempt
    /// reserves a limiter slot before credentials are checked; the slot is
    /// handed back on success so only failures count towards the limit.
    pub async fn login(&self, request: LoginRequest, client: &str) -> Result<AuthToken, AuthError> {
        let key = RateLimiters::login_key(client, &normalize_email(&request.email));
        self.limiters
            .login
            .hit(&key)
            .map_err(|e| rate_limited("login", &key, e, RateLimiters::LOGIN_MESSAGE))?;

        let result = self
            .verify_credentials(&request)
            .await
            .and_then(|user| self.tokens.issue(&user).map(|token| AuthToken { token, user }));

        match &result {
            Ok(issued) => {
                self.limiters.login.release(&key);
                info!(user_id = %issued.user.id, client, "login succeeded");
            }
            Err(e) if e.is_internal() => self.limiters.login.release(&key),
            Err(_) => info!(client, "login failed"),
        }

        result
    }

    async fn verify_credentials(&self, request: &LoginRequest) -> Result<User, AuthError> {
        let email = validate_login(&request.email, &request.password)?;

        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Verify a bearer token
    pub fn authenticate(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.verify(token)
    }

    /// Load the stored record for `user_id` and require it to hold `role`.
    ///
    /// Roles come from the store, not from token claims.
    pub async fn require_role(&self, user_id: &str, role: RoleName) -> Result<User, AuthError> {
        match self.user_repo.find_by_id(user_id).await? {
            Some(user) if user.has_role(role) => Ok(user),
            Some(_) => Err(AuthError::Forbidden(format!("Requires {} role", role))),
            None => Err(AuthError::Forbidden("Account no longer exists".to_string())),
        }
    }
}

fn rate_limited(
    endpoint: &str,
    key: &str,
    exceeded: RateLimitExceeded,
    message: &'static str,
) -> AuthError {
    RateLimiters::log_exceeded(endpoint, key, &exceeded);
    AuthError::RateLimited {
        message,
        limit: exceeded.limit,
        retry_after_secs: exceeded.retry_after.as_secs().max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::rate_limit::RateLimitPolicy;
    use crate::auth::sled_repository::SledUserRepository;
    use std::time::Duration;
    use tempfile::TempDir;

    const SECRET: &str = "test-secret-key-12345";

    struct Harness {
        _dir: TempDir,
        repo: Arc<dyn UserRepository>,
        service: AuthService,
    }

    fn harness_with(limiters: RateLimiters) -> Harness {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(SledUserRepository::new(dir.path().join("users.sled")).unwrap())
            as Arc<dyn UserRepository>;
        let service = AuthService::new(
            repo.clone(),
            Arc::new(TokenIssuer::new(SECRET)),
            Arc::new(limiters),
        );
        Harness {
            _dir: dir,
            repo,
            service,
        }
    }

    fn harness() -> Harness {
        // Generous limits so flow tests are not throttled
        let roomy = RateLimitPolicy::new(100, Duration::from_secs(60));
        harness_with(RateLimiters::new(roomy, roomy))
    }

    fn registration(email: &str, password: &str) -> RegistrationRequest {
        RegistrationRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_user_issues_token_for_stored_user() {
        let h = harness();

        let issued = h
            .service
            .register_user(registration("Voter@Example.com", "validPass1"), "10.0.0.1")
            .await
            .unwrap();

        let claims = h.service.authenticate(&issued.token).unwrap();
        let stored = h.repo.find_by_id(&claims.sub).await.unwrap().unwrap();
        assert_eq!(stored.email, "voter@example.com");
        assert_eq!(stored.role_names(), vec![RoleName::User]);
        assert_ne!(stored.password_hash, "validPass1");
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let h = harness();

        h.service
            .register_user(registration("dup@example.com", "validPass1"), "c")
            .await
            .unwrap();
        let result = h
            .service
            .register_user(registration("DUP@example.com", "otherPass2"), "c")
            .await;
        assert!(matches!(result, Err(AuthError::EmailAlreadyExists)));
    }

    #[tokio::test]
    async fn test_validation_precedes_store_access() {
        let h = harness();

        let result = h
            .service
            .register_user(registration("not-an-email", "short1"), "c")
            .await;
        match result {
            Err(AuthError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(!h.repo.exists_with_role(RoleName::User).await.unwrap());
    }

    #[tokio::test]
    async fn test_admin_bootstrap_then_gated() {
        let h = harness();

        let first = h
            .service
            .register_admin(registration("root@example.com", "validPass1"), &Requester::Anonymous, "c")
            .await
            .unwrap();
        assert!(first.user.has_role(RoleName::Admin));

        let anonymous = h
            .service
            .register_admin(registration("second@example.com", "validPass1"), &Requester::Anonymous, "c")
            .await;
        assert!(matches!(anonymous, Err(AuthError::Unauthorized)));

        let plain = h
            .service
            .register_user(registration("plain@example.com", "validPass1"), "c")
            .await
            .unwrap();
        let by_user = h
            .service
            .register_admin(
                registration("third@example.com", "validPass1"),
                &Requester::Authenticated(plain.user.id.clone()),
                "c",
            )
            .await;
        assert!(matches!(by_user, Err(AuthError::Forbidden(_))));

        let by_admin = h
            .service
            .register_admin(
                registration("fourth@example.com", "validPass1"),
                &Requester::Authenticated(first.user.id.clone()),
                "c",
            )
            .await
            .unwrap();
        assert!(by_admin.user.has_role(RoleName::Admin));
    }

    #[tokio::test]
    async fn test_manager_requires_admin() {
        let h = harness();
        let admin = h
            .service
            .register_admin(registration("root@example.com", "validPass1"), &Requester::Anonymous, "c")
            .await
            .unwrap();

        let anonymous = h
            .service
            .register_manager(registration("m@example.com", "validPass1"), &Requester::Anonymous, "c")
            .await;
        assert!(matches!(anonymous, Err(AuthError::Unauthorized)));

        let manager = h
            .service
            .register_manager(
                registration("m@example.com", "validPass1"),
                &Requester::Authenticated(admin.user.id.clone()),
                "c",
            )
            .await
            .unwrap();
        assert_eq!(manager.user.role_names(), vec![RoleName::Manager]);

        // Managers cannot create managers
        let by_manager = h
            .service
            .register_manager(
                registration("m2@example.com", "validPass1"),
                &Requester::Authenticated(manager.user.id.clone()),
                "c",
            )
            .await;
        assert!(matches!(by_manager, Err(AuthError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let h = harness();
        h.service
            .register_user(registration("voter@example.com", "validPass1"), "c")
            .await
            .unwrap();

        let wrong_password = h
            .service
            .login(login("voter@example.com", "wrongPass1"), "c")
            .await
            .unwrap_err();
        let unknown_email = h
            .service
            .login(login("ghost@example.com", "validPass1"), "c")
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());

        let ok = h
            .service
            .login(login(" VOTER@example.com", "validPass1"), "c")
            .await
            .unwrap();
        assert_eq!(h.service.authenticate(&ok.token).unwrap().sub, ok.user.id);
    }

    #[tokio::test]
    async fn test_registration_rate_limit_counts_every_call() {
        let h = harness_with(RateLimiters::default());

        for i in 0..5 {
            // Mix of successes and validation failures, all counted
            let email = if i % 2 == 0 {
                format!("user{}@example.com", i)
            } else {
                "bad".to_string()
            };
            let _ = h
                .service
                .register_user(registration(&email, "validPass1"), "10.0.0.9")
                .await;
        }

        let sixth = h
            .service
            .register_user(registration("user6@example.com", "validPass1"), "10.0.0.9")
            .await;
        match sixth {
            Err(AuthError::RateLimited { message, .. }) => {
                assert_eq!(message, RateLimiters::REGISTRATION_MESSAGE)
            }
            other => panic!("expected rate limit, got {:?}", other),
        }
        assert!(h.repo.find_by_email("user6@example.com").await.unwrap().is_none());

        // A different client is unaffected
        assert!(h
            .service
            .register_user(registration("user7@example.com", "validPass1"), "10.0.0.10")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_login_rate_limit_counts_only_failures() {
        let h = harness_with(RateLimiters::default());
        h.service
            .register_user(registration("voter@example.com", "validPass1"), "c")
            .await
            .unwrap();

        // Successful logins never count
        for _ in 0..10 {
            h.service
                .login(login("voter@example.com", "validPass1"), "10.0.0.1")
                .await
                .unwrap();
        }

        for _ in 0..4 {
            let err = h
                .service
                .login(login("voter@example.com", "wrongPass1"), "10.0.0.1")
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        // Below the limit a correct password still succeeds
        h.service
            .login(login("voter@example.com", "validPass1"), "10.0.0.1")
            .await
            .unwrap();

        let fifth = h
            .service
            .login(login("voter@example.com", "wrongPass1"), "10.0.0.1")
            .await
            .unwrap_err();
        assert!(matches!(fifth, AuthError::InvalidCredentials));

        // Limit tripped: even the right password is refused before credential checks
        let sixth = h
            .service
            .login(login("voter@example.com", "validPass1"), "10.0.0.1")
            .await
            .unwrap_err();
        assert!(matches!(sixth, AuthError::RateLimited { .. }));

        // Key includes the email and the client address
        h.service
            .login(login("voter@example.com", "validPass1"), "10.0.0.2")
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_wrong_passwords_are_capped() {
        let h = harness_with(RateLimiters::default());
        h.service
            .register_user(registration("v@example.com", "validPass1"), "setup")
            .await
            .unwrap();
        let Harness { _dir, service, .. } = h;
        let service = Arc::new(service);

        let mut handles = Vec::new();
        for _ in 0..30 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .login(login("v@example.com", "wrongPass1"), "10.0.0.1")
                    .await
                    .unwrap_err()
            }));
        }

        let mut guessed = 0;
        let mut limited = 0;
        for handle in handles {
            match handle.await.unwrap() {
                AuthError::InvalidCredentials => guessed += 1,
                AuthError::RateLimited { .. } => limited += 1,
                other => panic!("unexpected error {:?}", other),
            }
        }
        assert_eq!(guessed, 5);
        assert_eq!(limited, 25);

        let after = service
            .login(login("v@example.com", "validPass1"), "10.0.0.1")
            .await;
        assert!(matches!(after, Err(AuthError::RateLimited { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_anonymous_bootstrap_yields_one_admin() {
        let Harness { _dir, repo, service } = harness();
        let service = Arc::new(service);

        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .register_admin(
                        registration(&format!("admin{}@example.com", i), "validPass1"),
                        &Requester::Anonymous,
                        &format!("10.0.1.{}", i),
                    )
                    .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(issued) => {
                    assert!(issued.user.has_role(RoleName::Admin));
                    created += 1;
                }
                Err(e) => assert!(matches!(e, AuthError::Unauthorized), "{:?}", e),
            }
        }
        assert_eq!(created, 1);
        assert!(repo.exists_with_role(RoleName::Admin).await.unwrap());
    }

    #[tokio::test]
    async fn test_require_role_uses_stored_roles() {
        let h = harness();
        let admin = h
            .service
            .register_admin(registration("root@example.com", "validPass1"), &Requester::Anonymous, "c")
            .await
            .unwrap();
        let plain = h
            .service
            .register_user(registration("plain@example.com", "validPass1"), "c")
            .await
            .unwrap();

        assert!(h.service.require_role(&admin.user.id, RoleName::Admin).await.is_ok());
        assert!(matches!(
            h.service.require_role(&plain.user.id, RoleName::Admin).await,
            Err(AuthError::Forbidden(_))
        ));
        assert!(matches!(
            h.service.require_role("missing", RoleName::User).await,
            Err(AuthError::Forbidden(_))
        ));
    }
}
