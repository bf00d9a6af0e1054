//! Test utilities for x431-client
//!
//! Serves a stand-in vendor API on an ephemeral local port and hands out a
//! client configured against it.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::{ClientConfig, Result, X431Client};

/// A local server that shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: X431Client,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve `router` and build a client pointing both API and socket at it
    ///
    /// # Example
    ///
    /// ```ignore
    /// use x431_client::testing::TestServer;
    ///
    /// let server = TestServer::start(mock_vendor_router()).await?;
    /// let mut client = server.client.login(Credentials::new("u", "p")).await?;
    /// ```
    pub async fn start<S>(router: axum::Router<S>) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        Self::start_with_timeout(router, Duration::from_secs(2)).await
    }

    /// Serve `router` with a custom connect timeout on the client
    pub async fn start_with_timeout<S>(
        router: axum::Router<S>,
        connect_timeout: Duration,
    ) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| crate::X431Error::Transport(e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| crate::X431Error::Transport(e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let router: axum::Router = router.into();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let config = ClientConfig::with_urls(format!("http://{}/", addr), format!("ws://{}", addr))
            .request_timeout(Duration::from_secs(5))
            .connect_timeout(connect_timeout);
        let client = X431Client::with_config(config)?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Base URL of the HTTP API
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_binds_ephemeral_port() {
        let server = TestServer::start(axum::Router::new()).await.unwrap();
        assert_ne!(server.addr.port(), 0);
        assert_eq!(server.client.api_base().as_str(), server.base_url());
        server.shutdown().await;
    }
}
