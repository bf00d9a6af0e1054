//! x431 Remote Diagnostic Client
//!
//! Logs in to the x431 / Golo365 remote diagnostic service and negotiates
//! the realtime socket used to talk to a diagnostic device.
//!
//! # Example
//!
//! ```rust,no_run
//! use x431_client::{Credentials, X431Client};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = X431Client::new()?;
//!
//!     // One login per client; no token refresh
//!     let mut client = client.login(Credentials::new("user", "secret")).await?;
//!
//!     // sid fetch, reconnect notice, websocket upgrade
//!     let device = client.connect("ABCDEF123456").await?;
//!     println!("connected, sid = {:?}", device.sid());
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module serves a stand-in vendor router locally:
//!
//! ```rust,ignore
//! use x431_client::testing::TestServer;
//!
//! let server = TestServer::start(mock_vendor_router()).await?;
//! let client = server.client.login(credentials).await?;
//! ```

mod client;
mod config;
mod error;
mod session;
pub mod socketio;
pub mod testing;
mod types;

pub use client::{
    AuthenticatedClient, Endpoint, X431Client, STATUS_CODE_INVALID_PASSWORD,
    STATUS_CODE_INVALID_USERNAME, STATUS_CODE_OK,
};
pub use config::{ClientConfig, DEFAULT_API_URL, DEFAULT_SOCKET_URL};
pub use error::{CredentialError, Result, X431Error};
pub use session::{DeviceSession, DeviceSocket, HandshakeFailure, HandshakeState};
pub use types::*;
