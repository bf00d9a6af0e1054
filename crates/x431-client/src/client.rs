//! x431 HTTP client and the authenticated client built by login

use reqwest::header::{ACCEPT, CONTENT_TYPE, REFERER};
use reqwest::{Client, Method};
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{CredentialError, Result, X431Error};
use crate::session::DeviceSession;
use crate::types::{ApiResponse, Credentials, LoginData, SerialNumber, Session};

const ACCEPT_JSON: &str = "application/json";

/// Login succeeded
pub const STATUS_CODE_OK: i64 = 0;
/// Unknown username or account number
pub const STATUS_CODE_INVALID_USERNAME: i64 = 100002;
/// Wrong password
pub const STATUS_CODE_INVALID_PASSWORD: i64 = 100011;

/// Known JSON endpoints of the remote diagnostic API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Login,
    /// Device owner lookup; no flow uses it yet
    FindUserByNumber,
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Self::Login => Method::POST,
            Self::FindUserByNumber => Method::GET,
        }
    }

    /// Path relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::FindUserByNumber => "cn/findUserByNumber",
        }
    }
}

/// Unauthenticated client for the remote diagnostic HTTP API
#[derive(Debug, Clone)]
pub struct X431Client {
    client: Client,
    config: ClientConfig,
    api_base: Url,
    socket_base: Url,
}

impl X431Client {
    /// Client for the production service
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout_duration())
            .connect_timeout(config.connect_timeout_duration())
            .build()?;

        let api_base = config.api_base()?;
        let socket_base = config.socket_base()?;

        Ok(Self {
            client,
            config,
            api_base,
            socket_base,
        })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Log in and return the authenticated client
    ///
    /// Sends exactly one request. Credentials are dropped when this returns.
    /// A failed request or an empty body is `Transport`; a body that is not
    /// JSON, or lacks `code`/`msg`/`data`, is `Protocol`.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: Credentials) -> Result<AuthenticatedClient> {
        let response = self.request_json(Endpoint::Login, &credentials).await?;
        let session = session_from_login(response)?;
        info!(user_id = ?session.user_id(), "Logged in");

        Ok(AuthenticatedClient {
            inner: self.clone(),
            session,
            device: None,
        })
    }

    async fn request_json<B: serde::Serialize>(
        &self,
        endpoint: Endpoint,
        body: &B,
    ) -> Result<ApiResponse> {
        let url = self.api_base.join(endpoint.path())?;
        debug!("{} {}", endpoint.method(), url);

        let mut request = self
            .client
            .request(endpoint.method(), url)
            .header(CONTENT_TYPE, ACCEPT_JSON)
            .header(ACCEPT, ACCEPT_JSON)
            .header(REFERER, self.api_base.as_str());
        if endpoint.method() == Method::POST {
            request = request.json(body);
        }

        let text = request.send().await?.text().await?;
        if text.is_empty() {
            return Err(X431Error::Transport("empty response body".to_string()));
        }

        serde_json::from_str(&text)
            .map_err(|e| X431Error::protocol(format!("malformed response: {}", e)))
    }
}

/// Map a login response onto a session or the matching error
pub(crate) fn session_from_login(response: ApiResponse) -> Result<Session> {
    let (code, msg, data) = match (response.code, response.msg, response.data) {
        (Some(code), Some(msg), Some(data)) if !data.is_null() => (code, msg, data),
        _ => return Err(X431Error::protocol("malformed response")),
    };

    match code {
        STATUS_CODE_OK => {}
        STATUS_CODE_INVALID_USERNAME => {
            return Err(X431Error::InvalidCredentials(CredentialError::InvalidUsername))
        }
        STATUS_CODE_INVALID_PASSWORD => {
            return Err(X431Error::InvalidCredentials(CredentialError::InvalidPassword))
        }
        code => return Err(X431Error::UnknownLoginFailure { code, msg }),
    }

    let data: LoginData = serde_json::from_value(data)
        .map_err(|e| X431Error::protocol(format!("malformed login data: {}", e)))?;
    Ok(data.into())
}

/// Client holding a logged-in session
///
/// Only obtainable through [`X431Client::login`], so device connections are
/// never attempted without a session.
#[derive(Debug)]
pub struct AuthenticatedClient {
    inner: X431Client,
    session: Session,
    device: Option<DeviceSession>,
}

impl AuthenticatedClient {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn user_id(&self) -> Option<String> {
        self.session.user_id()
    }

    /// The live device session, if one is open
    pub fn device_session(&mut self) -> Option<&mut DeviceSession> {
        self.device.as_mut().filter(|d| d.is_open())
    }

    /// Connect to the device with serial number `serial`
    ///
    /// Reuses the current device session while its socket is open. Otherwise
    /// runs a fresh handshake; a session is only kept once it is open.
    #[instrument(skip(self))]
    pub async fn connect(&mut self, serial: &str) -> Result<&mut DeviceSession> {
        let serial = SerialNumber::parse(serial)?;

        let reusable = self.device.as_ref().is_some_and(DeviceSession::is_open);
        if !reusable {
            self.device = None;

            let mut device = DeviceSession::new(
                self.inner.client.clone(),
                self.inner.api_base.clone(),
                self.inner.socket_base.clone(),
                self.inner.config.connect_timeout_duration(),
                &self.session,
                serial,
            )?;
            device.open().await?;
            self.device = Some(device);
        } else {
            debug!("Reusing open device session");
        }

        self.device
            .as_mut()
            .ok_or_else(|| X431Error::Socket("device session missing after handshake".to_string()))
    }

    /// Close and drop the current device session
    pub async fn disconnect(&mut self) -> Result<()> {
        match self.device.take() {
            Some(mut device) => device.close().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: serde_json::Value) -> ApiResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_client_creation() {
        assert!(X431Client::new().is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let config = ClientConfig::with_urls("not a url", "ws://localhost");
        assert!(matches!(
            X431Client::with_config(config),
            Err(X431Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(Endpoint::Login.method(), Method::POST);
        assert_eq!(Endpoint::Login.path(), "login");
        assert_eq!(Endpoint::FindUserByNumber.method(), Method::GET);
        assert_eq!(Endpoint::FindUserByNumber.path(), "cn/findUserByNumber");
    }

    #[test]
    fn test_login_success() {
        let session = session_from_login(envelope(json!({
            "code": 0,
            "msg": "",
            "data": {"token": "t0k3n", "user": {"user_id": "42", "nick_name": "bob"}}
        })))
        .unwrap();

        assert_eq!(session.token(), "t0k3n");
        assert_eq!(session.user_id().as_deref(), Some("42"));
        assert_eq!(session.user()["nick_name"], "bob");
    }

    #[test]
    fn test_login_invalid_credentials() {
        let err = session_from_login(envelope(json!({
            "code": 100002, "msg": "no such user", "data": {}
        })))
        .unwrap_err();
        assert!(matches!(
            err,
            X431Error::InvalidCredentials(CredentialError::InvalidUsername)
        ));

        let err = session_from_login(envelope(json!({
            "code": 100011, "msg": "bad password", "data": {}
        })))
        .unwrap_err();
        assert!(matches!(
            err,
            X431Error::InvalidCredentials(CredentialError::InvalidPassword)
        ));
    }

    #[test]
    fn test_login_missing_fields() {
        for body in [
            json!({"msg": "", "data": {}}),
            json!({"code": 0, "data": {}}),
            json!({"code": 0, "msg": ""}),
            json!({"code": 0, "msg": "", "data": null}),
            json!({}),
        ] {
            assert!(matches!(
                session_from_login(envelope(body)),
                Err(X431Error::Protocol(_))
            ));
        }
    }

    #[test]
    fn test_login_unknown_code() {
        let err = session_from_login(envelope(json!({
            "code": 500, "msg": "maintenance", "data": {}
        })))
        .unwrap_err();
        assert!(matches!(err, X431Error::UnknownLoginFailure { code: 500, .. }));
    }

    #[test]
    fn test_login_success_without_token() {
        let err = session_from_login(envelope(json!({
            "code": 0, "msg": "", "data": {"user": {}}
        })))
        .unwrap_err();
        assert!(matches!(err, X431Error::Protocol(_)));
    }
}
