//! Bearer token issuing and verification.
//!
//! Tokens are HS256 JWTs signed with a process-wide secret. They are stateless:
//! there is no revocation list, a token is valid until its `exp` claim passes.

use super::error::AuthError;
use super::models::{RoleName, User};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default token lifetime
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub roles: Vec<RoleName>,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer with the default one hour lifetime
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
    }

    pub fn with_ttl(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    #[cfg(test)]
    fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Sign a token for `user`
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            roles: user.role_names(),
            iat: now,
            exp: now + self.ttl.num_seconds(),
        };

        debug!(user_id = %user.id, "issuing token");
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    /// Check signature and expiry.
    ///
    /// Malformed, tampered and expired tokens all fail the same way.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(reason = %e, "token rejected");
                AuthError::InvalidToken
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(role: RoleName) -> User {
        User::new("voter@example.com".to_string(), "hash".to_string(), role)
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = TokenIssuer::new("test-secret-key-12345");
        let user = test_user(RoleName::Manager);

        let token = issuer.issue(&user).unwrap();
        let claims = issuer.verify(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "voter@example.com");
        assert_eq!(claims.roles, vec![RoleName::Manager]);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_different_secrets_reject() {
        let issuer1 = TokenIssuer::new("secret1");
        let issuer2 = TokenIssuer::new("secret2");

        let token = issuer1.issue(&test_user(RoleName::User)).unwrap();
        assert!(matches!(issuer2.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_and_tampered_fail_identically() {
        let issuer = TokenIssuer::new("test-secret-key-12345");
        let user = test_user(RoleName::User);
        let now = Utc::now().timestamp();

        let expired = issuer
            .sign(&Claims {
                sub: user.id.clone(),
                email: user.email.clone(),
                roles: user.role_names(),
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();

        let token = issuer.issue(&user).unwrap();
        let idx = token.len() - 10;
        let swapped = if &token[idx..idx + 1] == "A" { "B" } else { "A" };
        let tampered = format!("{}{}{}", &token[..idx], swapped, &token[idx + 1..]);

        let expired_err = issuer.verify(&expired).unwrap_err();
        let tampered_err = issuer.verify(&tampered).unwrap_err();
        let garbage_err = issuer.verify("not.a.token").unwrap_err();

        assert!(matches!(expired_err, AuthError::InvalidToken));
        assert!(matches!(tampered_err, AuthError::InvalidToken));
        assert!(matches!(garbage_err, AuthError::InvalidToken));
        assert_eq!(expired_err.to_string(), tampered_err.to_string());
    }

    #[test]
    fn test_custom_ttl() {
        let issuer = TokenIssuer::with_ttl("secret", Duration::minutes(5));
        assert_eq!(issuer.ttl_secs(), 300);

        let claims = issuer.verify(&issuer.issue(&test_user(RoleName::Admin)).unwrap()).unwrap();
        assert_eq!(claims.exp - claims.iat, 300);
    }
}
