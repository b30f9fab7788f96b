//! HTTP client configuration.

use crate::{ApiError, ApiResult};
use std::time::Duration;
use url::Url;

/// Base endpoint used when `PIXELFORGE_API_BASE_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1/";

/// Request timeout used when `PIXELFORGE_API_TIMEOUT_SECS` is not set.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for the shared HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base endpoint every relative API path is joined onto.
    pub base_url: Url,

    /// Timeout applied to every request.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration for `base_url` with the default timeout.
    ///
    /// A missing trailing slash is added so relative paths join under the
    /// base path instead of replacing its last segment.
    pub fn new(base_url: &str) -> ApiResult<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the configuration from the environment.
    pub fn from_env() -> ApiResult<Self> {
        let base_url = std::env::var("PIXELFORGE_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout = std::env::var("PIXELFORGE_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        Ok(Self::new(&base_url)?.with_timeout(timeout))
    }
}

fn normalize_base_url(raw: &str) -> ApiResult<Url> {
    let mut url = Url::parse(raw).map_err(ApiError::InvalidUrl)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_uses_default_timeout() {
        let config = ClientConfig::new(DEFAULT_BASE_URL).unwrap();
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = ClientConfig::new("https://api.example.com/api/v1").unwrap();
        assert_eq!(config.base_url.as_str(), "https://api.example.com/api/v1/");
        assert_eq!(
            config.base_url.join("job/status/3").unwrap().as_str(),
            "https://api.example.com/api/v1/job/status/3"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ClientConfig::new("not a url").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn test_with_timeout() {
        let config = ClientConfig::new(DEFAULT_BASE_URL)
            .unwrap()
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
