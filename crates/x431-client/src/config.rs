//! Client configuration
//!
//! Defaults point at the production x431 service. Tests and staging setups
//! override `api_url` and `socket_url`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// Production API base URL (also sent as `Referer`)
pub const DEFAULT_API_URL: &str = "https://remotediag.x431.com/";
/// Production socket endpoint (TLS on port 443)
pub const DEFAULT_SOCKET_URL: &str = "wss://remotediag.x431.com";

/// Connection settings for the remote diagnostic service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the HTTP API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Scheme, host and port of the realtime socket endpoint
    #[serde(default = "default_socket_url")]
    pub socket_url: String,

    /// Timeout for each HTTP request, in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Connect timeout for HTTP requests and the socket upgrade, in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            socket_url: default_socket_url(),
            request_timeout_ms: default_request_timeout(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_socket_url() -> String {
    DEFAULT_SOCKET_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_connect_timeout() -> u64 {
    10_000
}

impl ClientConfig {
    /// Configuration pointing both endpoints at custom URLs
    pub fn with_urls(api_url: impl Into<String>, socket_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            socket_url: socket_url.into(),
            ..Self::default()
        }
    }

    /// Set the socket connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = duration_to_millis(timeout);
        self
    }

    /// Set the HTTP request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = duration_to_millis(timeout);
        self
    }

    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Parse the API URL, forcing a trailing slash so relative joins keep
    /// any path prefix
    pub fn api_base(&self) -> Result<Url> {
        Ok(Url::parse(&with_trailing_slash(&self.api_url))?)
    }

    /// Parse the socket URL
    pub fn socket_base(&self) -> Result<Url> {
        Ok(Url::parse(&with_trailing_slash(&self.socket_url))?)
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}
