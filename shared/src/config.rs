use crate::{Error, Result};
use tracing::warn;

/// Attempt limits for one rate-limited endpoint family
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitSettings {
    pub max_attempts: u32,
    pub window_secs: u64,
}

pub struct Config {
    pub host: String,
    pub http_port: u16,
    pub data_dir: String,
    pub jwt_secret: String,
    pub allowed_origins: Vec<String>,
    /// Reverse proxies in front of the server whose `X-Forwarded-For` hops are trusted
    pub trusted_proxies: usize,
    pub register_limit: LimitSettings,
    pub login_limit: LimitSettings,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("http_port", &self.http_port)
            .field("data_dir", &self.data_dir)
            .field("jwt_secret", &"<redacted>")
            .field("allowed_origins", &self.allowed_origins)
            .field("trusted_proxies", &self.trusted_proxies)
            .field("register_limit", &self.register_limit)
            .field("login_limit", &self.login_limit)
            .finish()
    }
}

impl Config {
    const DEFAULT_HOST: &str = "0.0.0.0";
    const DEFAULT_HTTP_PORT: u16 = 5000;
    const DEFAULT_DATA_DIR: &str = "./data";
    const DEFAULT_ALLOWED_ORIGINS: &str = "https://localhost:5173";

    pub const DEFAULT_REGISTER_LIMIT: LimitSettings = LimitSettings {
        max_attempts: 5,
        window_secs: 15 * 60,
    };
    pub const DEFAULT_LOGIN_LIMIT: LimitSettings = LimitSettings {
        max_attempts: 5,
        window_secs: 10 * 60,
    };

    /// Load configuration from process environment variables.
    ///
    /// Fails when `JWT_SECRET` is absent: the server cannot sign tokens without it.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(Error::MissingConfig("JWT_SECRET"))?;

        let http_port = match lookup("PULSEVOTE_HTTP_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| Error::InvalidConfig {
                key: "PULSEVOTE_HTTP_PORT",
                value: raw,
            })?,
            None => Self::DEFAULT_HTTP_PORT,
        };

        // Zero means the socket peer is the client
        let trusted_proxies = match lookup("PULSEVOTE_TRUSTED_PROXIES") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| Error::InvalidConfig {
                key: "PULSEVOTE_TRUSTED_PROXIES",
                value: raw,
            })?,
            None => 0,
        };

        Ok(Self {
            host: lookup("PULSEVOTE_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            http_port,
            data_dir: lookup("PULSEVOTE_DATA_DIR")
                .unwrap_or_else(|| Self::DEFAULT_DATA_DIR.to_string()),
            jwt_secret,
            allowed_origins: lookup("PULSEVOTE_ALLOWED_ORIGINS")
                .unwrap_or_else(|| Self::DEFAULT_ALLOWED_ORIGINS.to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            trusted_proxies,
            register_limit: limit_from_lookup(
                &lookup,
                "PULSEVOTE_REGISTER_MAX_ATTEMPTS",
                "PULSEVOTE_REGISTER_WINDOW_SECS",
                Self::DEFAULT_REGISTER_LIMIT,
            ),
            login_limit: limit_from_lookup(
                &lookup,
                "PULSEVOTE_LOGIN_MAX_ATTEMPTS",
                "PULSEVOTE_LOGIN_WINDOW_SECS",
                Self::DEFAULT_LOGIN_LIMIT,
            ),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

fn limit_from_lookup<F>(
    lookup: &F,
    max_key: &str,
    window_key: &str,
    default: LimitSettings,
) -> LimitSettings
where
    F: Fn(&str) -> Option<String>,
{
    let max_attempts = lookup(max_key)
        .and_then(|raw| match raw.parse::<u32>() {
            Ok(v) if v > 0 => Some(v),
            _ => {
                warn!("{} has invalid value '{}', using default", max_key, raw);
                None
            }
        })
        .unwrap_or(default.max_attempts);

    let window_secs = lookup(window_key)
        .and_then(|raw| match raw.parse::<u64>() {
            Ok(v) if v > 0 => Some(v),
            _ => {
                warn!("{} has invalid value '{}', using default", window_key, raw);
                None
            }
        })
        .unwrap_or(default.window_secs);

    LimitSettings {
        max_attempts,
        window_secs,
    }
}
