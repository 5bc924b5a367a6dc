use std::fmt;
use std::time::Duration;

use crate::error::{Result, StabilityError};

/// Default Stability API host.
pub const DEFAULT_HOST: &str = "https://api.stability.ai";

/// Default engine for text-to-image and image-to-image.
pub const DEFAULT_ENGINE: &str = "stable-diffusion-v1-6";

/// Default engine for upscaling.
pub const DEFAULT_UPSCALE_ENGINE: &str = "esrgan-v1-x2plus";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "STABILITY_KEY";

/// Environment variable holding an alternate API host.
pub const HOST_ENV: &str = "STABILITY_HOST";

/// A Stability API key. `Debug` output never shows the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Connection settings for [`StabilityClient`](crate::StabilityClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API host (e.g., "https://api.stability.ai")
    pub host: String,
    /// Credential sent as a bearer token
    pub api_key: ApiKey,
    /// Engine used for text-to-image and image-to-image
    pub engine: String,
    /// Engine used for upscaling
    pub upscale_engine: String,
    /// Request timeout (default: 120s)
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a config for the default host with the given key.
    pub fn new(api_key: impl Into<ApiKey>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_key: api_key.into(),
            engine: DEFAULT_ENGINE.to_string(),
            upscale_engine: DEFAULT_UPSCALE_ENGINE.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Build a config from `STABILITY_KEY` and `STABILITY_HOST`, loading a
    /// `.env` file first if one is present.
    pub fn from_env() -> Result<Self> {
        Self::from_env_or(None)
    }

    /// Like [`from_env`](Self::from_env), but use `fallback_key` when
    /// `STABILITY_KEY` is unset. A key found in the environment wins.
    pub fn from_env_or(fallback_key: Option<ApiKey>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let key = require_key(env_var(API_KEY_ENV).map(ApiKey::from).or(fallback_key))?;
        let config = Self::new(key);
        Ok(match env_var(HOST_ENV) {
            Some(host) => config.host(host),
            None => config,
        })
    }

    /// Set the API host. Trailing slashes are trimmed and `https://` is
    /// assumed when no scheme is given.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = normalize_host(host.into());
        self
    }

    /// Set the engine used for generation.
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Set the engine used for upscaling.
    pub fn upscale_engine(mut self, engine: impl Into<String>) -> Self {
        self.upscale_engine = engine.into();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Reject a missing or blank key.
pub(crate) fn require_key(key: Option<ApiKey>) -> Result<ApiKey> {
    key.filter(|key| !key.is_empty())
        .ok_or_else(|| StabilityError::MissingApiKey(API_KEY_ENV.to_string()))
}

/// Read a non-blank environment variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_host(host: String) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Serializes tests that touch `STABILITY_KEY` / `STABILITY_HOST`.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Set or clear the two Stability variables for a test.
#[cfg(test)]
pub(crate) fn set_test_env(key: Option<&str>, host: Option<&str>) {
    for (name, value) in [(API_KEY_ENV, key), (HOST_ENV, host)] {
        match value {
            Some(value) => std::env::set_var(name, value),
            None => std::env::remove_var(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("https://api.stability.ai/".into()),
            "https://api.stability.ai"
        );
        assert_eq!(
            normalize_host("http://localhost:8080///".into()),
            "http://localhost:8080"
        );
        assert_eq!(
            normalize_host("grpc.stability.ai:443".into()),
            "https://grpc.stability.ai:443"
        );
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("sk-test");
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.engine, "stable-diffusion-v1-6");
        assert_eq!(config.upscale_engine, "esrgan-v1-x2plus");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.api_key.expose(), "sk-test");
    }

    #[test]
    fn test_builder_chain() {
        let config = ClientConfig::new("sk-test")
            .host("http://127.0.0.1:9000/")
            .engine("stable-diffusion-xl-1024-v1-0")
            .upscale_engine("esrgan-v1-x2plus")
            .timeout(Duration::from_secs(30));
        assert_eq!(config.host, "http://127.0.0.1:9000");
        assert_eq!(config.engine, "stable-diffusion-xl-1024-v1-0");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let config = ClientConfig::new("sk-very-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("ApiKey(****)"));
    }

    #[test]
    fn test_blank_key_is_empty() {
        assert!(ApiKey::new("   ").is_empty());
        assert!(!ApiKey::new("sk-1").is_empty());
    }

    #[test]
    fn test_from_env_reads_key_and_host() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        set_test_env(Some("sk-env"), Some("http://10.0.0.1:8080/"));
        let config = ClientConfig::from_env().unwrap();
        set_test_env(None, None);

        assert_eq!(config.api_key.expose(), "sk-env");
        assert_eq!(config.host, "http://10.0.0.1:8080");
    }

    #[test]
    fn test_from_env_without_key_fails() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        set_test_env(None, None);
        let err = ClientConfig::from_env().unwrap_err();
        assert!(matches!(err, StabilityError::MissingApiKey(_)));

        set_test_env(Some("   "), None);
        let err = ClientConfig::from_env().unwrap_err();
        set_test_env(None, None);
        assert!(matches!(err, StabilityError::MissingApiKey(_)));
    }

    #[test]
    fn test_from_env_or_prefers_env_key() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        set_test_env(Some("sk-env"), None);
        let config = ClientConfig::from_env_or(Some("sk-fallback".into())).unwrap();
        set_test_env(None, None);
        assert_eq!(config.api_key.expose(), "sk-env");
        assert_eq!(config.host, DEFAULT_HOST);

        let config = ClientConfig::from_env_or(Some("sk-fallback".into())).unwrap();
        assert_eq!(config.api_key.expose(), "sk-fallback");
    }
}
