use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderName;

use crate::error::AppError;

pub const DEFAULT_ENDPOINT_URL: &str =
    "https://dev.microsofttranslator.com/apps/endpoint?api-version=1.0";
pub const DEFAULT_SPEECH_BASE_URL: &str = "https://{region}.tts.speech.microsoft.com";
pub const DEFAULT_AUTH_HEADER: &str = "x-auth-token";

/// Server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Shared secret callers must present. `None` disables the check.
    pub auth_token: Option<String>,
    pub auth_header: String,
    pub endpoint_url: String,
    /// Base URL of the speech service; `{region}` is replaced with the
    /// region issued alongside the credential.
    pub speech_base_url: String,
    pub voice_cache_ttl: Duration,
    /// Upper bound on a credential refresh request.
    pub endpoint_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            auth_token: None,
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            speech_base_url: DEFAULT_SPEECH_BASE_URL.to_string(),
            voice_cache_ttl: Duration::from_secs(3600),
            endpoint_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| AppError::Config(format!("PORT must be a number, got '{}'", p)))?,
            None => defaults.port,
        };

        let voice_cache_ttl = match lookup("VOICE_CACHE_TTL_SECS") {
            Some(s) => Duration::from_secs(s.parse().map_err(|_| {
                AppError::Config(format!("VOICE_CACHE_TTL_SECS must be a number, got '{}'", s))
            })?),
            None => defaults.voice_cache_ttl,
        };

        let endpoint_timeout = match lookup("ENDPOINT_TIMEOUT_SECS") {
            Some(s) => Duration::from_secs(s.parse().map_err(|_| {
                AppError::Config(format!("ENDPOINT_TIMEOUT_SECS must be a number, got '{}'", s))
            })?),
            None => defaults.endpoint_timeout,
        };

        let auth_header = match lookup("AUTH_HEADER").filter(|h| !h.is_empty()) {
            Some(h) => HeaderName::from_bytes(h.as_bytes())
                .map_err(|_| {
                    AppError::Config(format!("AUTH_HEADER is not a valid header name: '{}'", h))
                })?
                .as_str()
                .to_string(),
            None => defaults.auth_header,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            auth_token: lookup("AUTH_TOKEN").filter(|t| !t.is_empty()),
            auth_header,
            endpoint_url: lookup("TTS_ENDPOINT_URL").unwrap_or(defaults.endpoint_url),
            speech_base_url: lookup("TTS_SPEECH_BASE_URL").unwrap_or(defaults.speech_base_url),
            voice_cache_ttl,
            endpoint_timeout,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid address {}:{}", self.host, self.port)))
    }
}
