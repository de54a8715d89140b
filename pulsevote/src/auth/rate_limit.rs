//! In-memory sliding-window rate limiting.
//!
//! Each key keeps the instants of its recent attempts. Attempts older than the
//! window are pruned on every touch, so a key recovers on its own once the
//! window has elapsed. State is process-local and lost on restart.

use dashmap::DashMap;
use shared::config::LimitSettings;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::warn;

/// Attempts allowed per key inside a trailing window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_attempts: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
        }
    }
}

impl From<LimitSettings> for RateLimitPolicy {
    fn from(settings: LimitSettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_secs(settings.window_secs),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitExceeded {
    /// Attempts allowed per window
    pub limit: u32,
    /// Time until the oldest counted attempt leaves the window
    pub retry_after: Duration,
}

pub struct SlidingWindowLimiter {
    policy: RateLimitPolicy,
    attempts: DashMap<String, VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            attempts: DashMap::new(),
        }
    }

    #[cfg(test)]
    fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Count one attempt for `key`, rejecting it if the window is already full.
    /// Rejected attempts are not recorded.
    pub fn hit(&self, key: &str) -> Result<(), RateLimitExceeded> {
        self.hit_at(key, Instant::now())
    }

    /// Give back the most recent attempt counted against `key`.
    ///
    /// Lets a caller reserve a slot with `hit` up front and return it once the
    /// attempt turns out not to count.
    pub fn release(&self, key: &str) {
        if let Some(mut entry) = self.attempts.get_mut(key) {
            entry.pop_back();
        }
    }

    #[cfg(test)]
    fn attempts(&self, key: &str) -> usize {
        let now = Instant::now();
        self.attempts
            .get_mut(key)
            .map(|mut entry| {
                self.prune(&mut entry, now);
                entry.len()
            })
            .unwrap_or(0)
    }

    /// Drop keys whose attempts have all left the window
    pub fn cleanup(&self) {
        self.cleanup_at(Instant::now())
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.attempts.len()
    }

    fn cleanup_at(&self, now: Instant) {
        self.attempts.retain(|_, entry| {
            self.prune(entry, now);
            !entry.is_empty()
        });
    }

    fn hit_at(&self, key: &str, now: Instant) -> Result<(), RateLimitExceeded> {
        // The entry guard holds the shard lock, so prune/compare/push is atomic per key
        let mut entry = self.attempts.entry(key.to_string()).or_default();
        self.prune(&mut entry, now);
        self.ensure_capacity(&entry, now)?;
        entry.push_back(now);
        Ok(())
    }

    fn prune(&self, entry: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = entry.front() {
            if now.saturating_duration_since(*oldest) >= self.policy.window {
                entry.pop_front();
            } else {
                break;
            }
        }
    }

    fn ensure_capacity(
        &self,
        entry: &VecDeque<Instant>,
        now: Instant,
    ) -> Result<(), RateLimitExceeded> {
        if entry.len() < self.policy.max_attempts as usize {
            return Ok(());
        }

        let retry_after = entry
            .front()
            .map(|oldest| (*oldest + self.policy.window).saturating_duration_since(now))
            .unwrap_or(self.policy.window);

        Err(RateLimitExceeded {
            limit: self.policy.max_attempts,
            retry_after,
        })
    }
}

/// The two limiters guarding the auth endpoints
pub struct RateLimiters {
    pub registration: SlidingWindowLimiter,
    pub login: SlidingWindowLimiter,
}

impl RateLimiters {
    pub const REGISTRATION_MESSAGE: &str =
        "Too many registration attempts. Please try again later.";
    pub const LOGIN_MESSAGE: &str = "Too many login attempts. Please try again later.";

    pub fn new(registration: RateLimitPolicy, login: RateLimitPolicy) -> Self {
        Self {
            registration: SlidingWindowLimiter::new(registration),
            login: SlidingWindowLimiter::new(login),
        }
    }

    /// Registration keys on the client address alone
    pub fn registration_key(client: &str) -> String {
        client.to_string()
    }

    /// Login keys on client address plus the attempted email
    pub fn login_key(client: &str, email: &str) -> String {
        format!("{}:{}", client, email)
    }

    pub fn cleanup(&self) {
        self.registration.cleanup();
        self.login.cleanup();
    }

    pub fn log_exceeded(endpoint: &str, key: &str, exceeded: &RateLimitExceeded) {
        warn!(
            endpoint,
            key,
            retry_after_secs = exceeded.retry_after.as_secs(),
            "Rate limit exceeded"
        );
    }
}

impl Default for RateLimiters {
    /// Registration: 5 attempts per 15 minutes. Login: 5 failures per 10 minutes.
    fn default() -> Self {
        Self::new(
            shared::config::Config::DEFAULT_REGISTER_LIMIT.into(),
            shared::config::Config::DEFAULT_LOGIN_LIMIT.into(),
        )
    }
}
