//! Error types for x431 client operations

use thiserror::Error;

/// Result type alias for x431 client operations
pub type Result<T> = std::result::Result<T, X431Error>;

/// Errors that can occur while talking to the remote diagnostic service
///
/// Every variant is terminal for the call that produced it; nothing is
/// retried by the client.
#[derive(Error, Debug)]
pub enum X431Error {
    /// Login rejected the username or the password
    #[error("Login error: {0}")]
    InvalidCredentials(CredentialError),

    /// The vendor answered with something that does not match its contract
    #[error("API error: {0}")]
    Protocol(String),

    /// Login returned a status code we have no mapping for
    #[error("Unknown login failure (code {code}): {msg}")]
    UnknownLoginFailure { code: i64, msg: String },

    /// HTTP request failed or returned no body
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serial number does not have the expected length
    #[error("Invalid serial number: expected {expected} characters, got {actual}")]
    InvalidSerial { expected: usize, actual: usize },

    /// No usable session to open a device connection with
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// Polling negotiation did not yield a transport session id
    #[error("Unable to get WebSocket SID: {0}")]
    NoSid(String),

    /// The vendor did not acknowledge the reconnect notice
    #[error("Unable to provide WebSocket connection notice: {0}")]
    NoticeRejected(String),

    /// WebSocket upgrade failed or timed out
    #[error("WebSocket error: {0}")]
    Socket(String),

    /// Invalid URL in configuration
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Which half of the credentials the vendor rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    InvalidUsername,
    InvalidPassword,
}

impl std::fmt::Display for CredentialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUsername => write!(f, "invalid username"),
            Self::InvalidPassword => write!(f, "invalid password"),
        }
    }
}

impl From<reqwest::Error> for X431Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl X431Error {
    /// Create a protocol error for a malformed vendor response
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}
