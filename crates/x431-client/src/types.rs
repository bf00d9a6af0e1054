//! Request and response types for the x431 API

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, X431Error};

/// Length of an AIT / Golo365 device serial number
pub const SERIAL_NUMBER_LENGTH: usize = 12;

// =============================================================================
// Login
// =============================================================================

/// Account credentials, consumed by login
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Envelope of every vendor JSON response
///
/// All fields are optional so that a missing field can be reported as a
/// protocol error instead of a deserialization failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Payload of a successful login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub token: String,
    pub user: Map<String, Value>,
}

// =============================================================================
// Session
// =============================================================================

/// Authenticated session: bearer token plus the user record returned at login
#[derive(Clone)]
pub struct Session {
    token: String,
    user: Map<String, Value>,
}

impl Session {
    pub fn new(token: impl Into<String>, user: Map<String, Value>) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// All key/value pairs of the login response's `data.user`
    pub fn user(&self) -> &Map<String, Value> {
        &self.user
    }

    /// The account's `user_id`, rendered as a string
    ///
    /// The vendor sends it either as a string or as a number.
    pub fn user_id(&self) -> Option<String> {
        match self.user.get("user_id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl From<LoginData> for Session {
    fn from(data: LoginData) -> Self {
        Self::new(data.token, data.user)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id())
            .finish()
    }
}

// =============================================================================
// Device target
// =============================================================================

/// Serial number of a physical diagnostic device
///
/// Only constructible through [`SerialNumber::parse`], so a value of this
/// type always has the right length.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerialNumber(String);

impl SerialNumber {
    pub fn parse(serial: &str) -> Result<Self> {
        if serial.len() != SERIAL_NUMBER_LENGTH {
            return Err(X431Error::InvalidSerial {
                expected: SERIAL_NUMBER_LENGTH,
                actual: serial.len(),
            });
        }
        Ok(Self(serial.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for SerialNumber {
    type Error = X431Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}
