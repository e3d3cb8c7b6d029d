//! Session client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_AUTH_URL: &str = "http://localhost:8081";
pub const DEFAULT_CATALOG_URL: &str = "http://localhost:8082";
pub const DEFAULT_EXPIRY_MARGIN_SECS: u64 = 5 * 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const STATE_DIR_NAME: &str = "cinetracks";

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    /// No state directory was configured and the platform has no data dir.
    #[error("no state directory: set CINETRACKS_STATE_DIR")]
    NoStateDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl HttpTimeouts {
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Base URL of the auth service (no trailing slash).
    pub auth_url: String,
    /// Base URL of the movie catalog service (no trailing slash).
    pub catalog_url: String,
    /// Directory holding the persisted session file.
    pub state_dir: PathBuf,
    /// Safety window subtracted from the token TTL before the logout timer fires.
    pub expiry_margin: Duration,
    pub timeouts: HttpTimeouts,
}

impl SessionConfig {
    /// Build typed config from environment variables.
    ///
    /// All optional:
    /// - `CINETRACKS_AUTH_URL`: default `http://localhost:8081`
    /// - `CINETRACKS_CATALOG_URL`: default `http://localhost:8082`
    /// - `CINETRACKS_STATE_DIR`: default `<platform data dir>/cinetracks`
    /// - `CINETRACKS_EXPIRY_MARGIN_SECS`: default 300
    /// - `CINETRACKS_REQUEST_TIMEOUT_SECS`: default 30
    /// - `CINETRACKS_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse or no state
    /// directory can be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        let auth_url = base_url(std::env::var("CINETRACKS_AUTH_URL").ok(), DEFAULT_AUTH_URL);
        let catalog_url = base_url(std::env::var("CINETRACKS_CATALOG_URL").ok(), DEFAULT_CATALOG_URL);

        let state_dir = match std::env::var("CINETRACKS_STATE_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => dirs::data_dir().ok_or(ConfigError::NoStateDir)?.join(STATE_DIR_NAME),
        };

        let margin_secs = env_parse_u64("CINETRACKS_EXPIRY_MARGIN_SECS", DEFAULT_EXPIRY_MARGIN_SECS)?;
        let timeouts = HttpTimeouts {
            request_secs: env_parse_u64("CINETRACKS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: env_parse_u64("CINETRACKS_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };

        Ok(Self { auth_url, catalog_url, state_dir, expiry_margin: Duration::from_secs(margin_secs), timeouts })
    }

    /// Config pointing both services at one origin, with default timing.
    /// Useful for tests and for deployments behind a single reverse proxy.
    #[must_use]
    pub fn for_origin(origin: &str, state_dir: PathBuf) -> Self {
        let origin = base_url(Some(origin.to_owned()), DEFAULT_AUTH_URL);
        Self {
            auth_url: origin.clone(),
            catalog_url: origin,
            state_dir,
            expiry_margin: Duration::from_secs(DEFAULT_EXPIRY_MARGIN_SECS),
            timeouts: HttpTimeouts::default(),
        }
    }
}

fn base_url(raw: Option<String>, default: &str) -> String {
    raw.filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
        .trim()
        .trim_end_matches('/')
        .to_owned()
}

fn env_parse_u64(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
        Err(_) => Ok(default),
    }
}
