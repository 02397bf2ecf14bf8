//! Client configuration.
//!
//! Points the client at the remote store and a retrieval gateway, and sets
//! the authentication challenge parameters. Load from the environment with
//! [`ClientConfig::from_env`] or point at a local mock with
//! [`ClientConfig::local`].

use std::time::Duration;

use url::Url;

/// Default retrieval gateway.
pub const DEFAULT_GATEWAY: &str = "w3s.link";

/// Default credential lifetime: 7 days.
pub const DEFAULT_AUTH_EXPIRES_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration for talking to the remote store.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the store API. Always ends with `/`.
    pub api_url: Url,
    /// Gateway host (or URL) used to fetch metadata documents.
    pub gateway: String,
    /// Relying-party domain embedded in auth challenges. `None` omits the
    /// domain and URI lines.
    pub auth_domain: Option<String>,
    /// Lifetime requested for new credentials.
    pub auth_expires_in: chrono::Duration,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// How long to wait for the signer before giving up.
    pub sign_timeout_secs: u64,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CARPOST_API_URL` (required)
    /// - `CARPOST_GATEWAY` (default: `w3s.link`)
    /// - `CARPOST_AUTH_DOMAIN` (default: the API host; set it empty to omit
    ///   the domain)
    /// - `CARPOST_AUTH_EXPIRES_SECS` (default: 604800)
    /// - `CARPOST_TIMEOUT_SECS` (default: 30)
    /// - `CARPOST_SIGN_TIMEOUT_SECS` (default: 120)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("CARPOST_API_URL").map_err(|_| ConfigError::MissingApiUrl)?;
        let api_url = parse_api_url("CARPOST_API_URL", &raw)?;

        let auth_domain = match std::env::var("CARPOST_AUTH_DOMAIN") {
            Ok(domain) if domain.trim().is_empty() => None,
            Ok(domain) => Some(domain.trim().to_string()),
            Err(_) => api_url.host_str().map(str::to_string),
        };

        let expires_secs = env_u64("CARPOST_AUTH_EXPIRES_SECS", DEFAULT_AUTH_EXPIRES_SECS)?;
        Ok(Self {
            api_url,
            gateway: std::env::var("CARPOST_GATEWAY").unwrap_or_else(|_| DEFAULT_GATEWAY.to_string()),
            auth_domain,
            auth_expires_in: expires_in(expires_secs)?,
            timeout_secs: env_u64("CARPOST_TIMEOUT_SECS", 30)?,
            sign_timeout_secs: env_u64("CARPOST_SIGN_TIMEOUT_SECS", 120)?,
        })
    }

    /// Configuration pointing at a local mock server (for testing).
    ///
    /// The same server doubles as the gateway. No auth domain is set.
    pub fn local(base: &str) -> Result<Self, ConfigError> {
        let api_url = parse_api_url("local", base)?;
        Ok(Self {
            gateway: base.trim_end_matches('/').to_string(),
            api_url,
            auth_domain: None,
            auth_expires_in: expires_in(DEFAULT_AUTH_EXPIRES_SECS)?,
            timeout_secs: 5,
            sign_timeout_secs: 5,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn sign_timeout(&self) -> Duration {
        Duration::from_secs(self.sign_timeout_secs)
    }
}

fn parse_api_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(
            var.to_string(),
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn env_u64(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

fn expires_in(secs: u64) -> Result<chrono::Duration, ConfigError> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| ConfigError::InvalidValue("CARPOST_AUTH_EXPIRES_SECS".into(), secs.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CARPOST_API_URL environment variable is required")]
    MissingApiUrl,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
}
