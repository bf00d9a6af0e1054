//! Device session: the three-step socket handshake
//!
//! ```text
//! Unstarted --GET polling--> SidFetched --POST imReconnect--> NoticeSent --upgrade--> SocketOpen
//!     \______________________________\__________________________\_______> Failed(reason)
//! ```
//!
//! A failed handshake is never resumed; callers build a new session, which
//! starts over at the sid fetch.

use std::fmt;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{Result, X431Error};
use crate::socketio;
use crate::types::{SerialNumber, Session};

/// Duplex channel handed to the caller once the handshake completes
pub type DeviceSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a handshake stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeFailure {
    NoSid,
    NoticeRejected,
    SocketError,
}

/// Handshake progress of a [`DeviceSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Unstarted,
    SidFetched,
    NoticeSent,
    SocketOpen,
    Failed(HandshakeFailure),
    /// Transport closed by the caller
    Closed,
}

impl HandshakeState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::SocketOpen)
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unstarted => write!(f, "unstarted"),
            Self::SidFetched => write!(f, "sid fetched"),
            Self::NoticeSent => write!(f, "notice sent"),
            Self::SocketOpen => write!(f, "socket open"),
            Self::Failed(HandshakeFailure::NoSid) => write!(f, "failed (no sid)"),
            Self::Failed(HandshakeFailure::NoticeRejected) => write!(f, "failed (notice rejected)"),
            Self::Failed(HandshakeFailure::SocketError) => write!(f, "failed (socket error)"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Realtime session with one diagnostic device
pub struct DeviceSession {
    http: Client,
    api_base: Url,
    socket_base: Url,
    connect_timeout: Duration,
    token: String,
    user_id: String,
    serial: SerialNumber,
    state: HandshakeState,
    sid: Option<String>,
    socket: Option<DeviceSocket>,
}

impl DeviceSession {
    /// Create an unstarted session for `serial`
    ///
    /// Fails with `NotAuthenticated` when `session` has no token or no user id.
    pub fn new(
        http: Client,
        api_base: Url,
        socket_base: Url,
        connect_timeout: Duration,
        session: &Session,
        serial: SerialNumber,
    ) -> Result<Self> {
        if session.token().is_empty() {
            return Err(X431Error::NotAuthenticated(
                "session has no token".to_string(),
            ));
        }
        let user_id = session.user_id().ok_or_else(|| {
            X431Error::NotAuthenticated("session has no user_id".to_string())
        })?;

        Ok(Self {
            http,
            api_base,
            socket_base,
            connect_timeout,
            token: session.token().to_string(),
            user_id,
            serial,
            state: HandshakeState::Unstarted,
            sid: None,
            socket: None,
        })
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Transport session id, once fetched
    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn serial(&self) -> &SerialNumber {
        &self.serial
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Run the handshake from `Unstarted` to `SocketOpen`
    ///
    /// Calling it on a session that is already open is a no-op. Any other
    /// state was reached through a failure or a close and cannot be resumed.
    #[instrument(skip(self), fields(serial = %self.serial))]
    pub async fn open(&mut self) -> Result<()> {
        match self.state {
            HandshakeState::Unstarted => {}
            HandshakeState::SocketOpen => return Ok(()),
            state => {
                return Err(X431Error::Socket(format!(
                    "session cannot be reopened from state: {}",
                    state
                )))
            }
        }

        let sid = self.fetch_sid().await.map_err(|e| self.fail(HandshakeFailure::NoSid, e))?;
        self.sid = Some(sid.clone());
        self.state = HandshakeState::SidFetched;
        debug!(sid = %sid, "Fetched transport session id");

        self.send_notice(&sid)
            .await
            .map_err(|e| self.fail(HandshakeFailure::NoticeRejected, e))?;
        self.state = HandshakeState::NoticeSent;
        debug!("Reconnect notice accepted");

        let socket = self
            .open_socket(&sid)
            .await
            .map_err(|e| self.fail(HandshakeFailure::SocketError, e))?;
        self.socket = Some(socket);
        self.state = HandshakeState::SocketOpen;
        debug!("Device socket open");

        Ok(())
    }

    /// Borrow the open socket
    pub fn socket_mut(&mut self) -> Option<&mut DeviceSocket> {
        self.socket.as_mut()
    }

    /// Take ownership of the open socket
    pub fn into_socket(self) -> Option<DeviceSocket> {
        self.socket
    }

    /// Close the underlying transport
    ///
    /// Only a websocket close frame is sent; the vendor defines no logout
    /// exchange for device sessions.
    #[instrument(skip(self), fields(serial = %self.serial))]
    pub async fn close(&mut self) -> Result<()> {
        let result = match self.socket.take() {
            Some(mut socket) => socket
                .close(None)
                .await
                .map_err(|e| X431Error::Socket(e.to_string())),
            None => Ok(()),
        };
        self.state = HandshakeState::Closed;
        result
    }

    fn fail(&mut self, reason: HandshakeFailure, err: X431Error) -> X431Error {
        warn!(?reason, error = %err, "Device handshake failed");
        self.state = HandshakeState::Failed(reason);
        err
    }

    async fn fetch_sid(&self) -> Result<String> {
        let url = socketio::polling_url(&self.api_base)?;
        debug!("Requesting sid from {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| X431Error::NoSid(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(X431Error::NoSid(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| X431Error::NoSid(e.to_string()))?;
        socketio::parse_sid(&body)
    }

    async fn send_notice(&self, sid: &str) -> Result<()> {
        let url = socketio::notice_url(&self.api_base, sid)?;
        let frame = socketio::reconnect_notice(&self.user_id, &self.token);

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(frame)
            .send()
            .await
            .map_err(|e| X431Error::NoticeRejected(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| X431Error::NoticeRejected(e.to_string()))?;

        if body == socketio::NOTICE_OK {
            Ok(())
        } else {
            Err(X431Error::NoticeRejected(format!(
                "unexpected response: {:?}",
                body
            )))
        }
    }

    async fn open_socket(&self, sid: &str) -> Result<DeviceSocket> {
        let url = socketio::websocket_url(&self.socket_base, sid)?;
        debug!("Upgrading to {}", url);
        install_crypto_provider();

        match tokio::time::timeout(self.connect_timeout, connect_async(url.as_str())).await {
            Ok(Ok((socket, _response))) => Ok(socket),
            Ok(Err(e)) => Err(X431Error::Socket(e.to_string())),
            Err(_) => Err(X431Error::Socket(format!(
                "connect timed out after {:?}",
                self.connect_timeout
            ))),
        }
    }
}

/// `wss://` upgrades need a process-level rustls provider. A provider the
/// host application installed first stays in place.
fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("serial", &self.serial)
            .field("state", &self.state)
            .field("sid", &self.sid)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn session_with(token: &str, user: serde_json::Value) -> Session {
        Session::new(token, user.as_object().cloned().unwrap_or_else(Map::new))
    }

    fn build(session: &Session) -> Result<DeviceSession> {
        DeviceSession::new(
            Client::new(),
            Url::parse("http://127.0.0.1:1/").unwrap(),
            Url::parse("ws://127.0.0.1:1/").unwrap(),
            Duration::from_secs(1),
            session,
            SerialNumber::parse("ABCDEF123456").unwrap(),
        )
    }

    #[test]
    fn test_new_session_is_unstarted() {
        let device = build(&session_with("tok", json!({"user_id": "u1"}))).unwrap();
        assert_eq!(device.state(), HandshakeState::Unstarted);
        assert!(device.sid().is_none());
        assert!(!device.is_open());
    }

    #[test]
    fn test_requires_token_and_user_id() {
        let err = build(&session_with("", json!({"user_id": "u1"}))).unwrap_err();
        assert!(matches!(err, X431Error::NotAuthenticated(_)));

        let err = build(&session_with("tok", json!({"name": "alice"}))).unwrap_err();
        assert!(matches!(err, X431Error::NotAuthenticated(_)));
    }

    #[tokio::test]
    async fn test_unreachable_vendor_fails_with_no_sid() {
        let mut device = build(&session_with("tok", json!({"user_id": "u1"}))).unwrap();
        let err = device.open().await.unwrap_err();
        assert!(matches!(err, X431Error::NoSid(_)));
        assert_eq!(device.state(), HandshakeState::Failed(HandshakeFailure::NoSid));

        // Failed sessions are not resumable
        assert!(device.open().await.is_err());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(HandshakeState::SocketOpen.to_string(), "socket open");
        assert_eq!(
            HandshakeState::Failed(HandshakeFailure::NoticeRejected).to_string(),
            "failed (notice rejected)"
        );
    }
}
