use pulsevote::auth::{AuthService, RateLimiters, TokenIssuer, UserRepository};
use std::sync::Arc;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    /// Reverse proxies whose `X-Forwarded-For` hops are trusted
    pub trusted_proxies: usize,
}

impl AppState {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        tokens: Arc<TokenIssuer>,
        limiters: Arc<RateLimiters>,
    ) -> Self {
        Self {
            auth_service: Arc::new(AuthService::new(user_repo, tokens, limiters)),
            trusted_proxies: 0,
        }
    }

    pub fn with_trusted_proxies(mut self, trusted_proxies: usize) -> Self {
        self.trusted_proxies = trusted_proxies;
        self
    }
}
