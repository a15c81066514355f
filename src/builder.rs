//! Builder pattern for connection configuration.
//!
//! Provides a fluent API for configuring and opening [`Connection`]s.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use cdp_socket::Connection;
//!
//! # async fn example() -> cdp_socket::Result<()> {
//! let connection = Connection::builder()
//!     .command_timeout(Duration::from_secs(10))
//!     .connect("ws://127.0.0.1:9222/devtools/page/ABC")
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;

use crate::error::Result;
use crate::options::SocketOptions;
use crate::transport::{self, Connection, Reporter};

// ============================================================================
// SocketBuilder
// ============================================================================

/// Builder for configuring a [`Connection`].
///
/// Use [`Connection::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct SocketBuilder {
    /// Options collected so far.
    options: SocketOptions,
}

// ============================================================================
// SocketBuilder Implementation
// ============================================================================

impl SocketBuilder {
    /// Creates a new builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default timeout for every command.
    #[inline]
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.options.command_timeout = Some(timeout);
        self
    }

    /// Limits the number of commands awaiting a response.
    #[inline]
    #[must_use]
    pub fn max_pending(mut self, limit: usize) -> Self {
        self.options.max_pending = Some(limit);
        self
    }

    /// Sets the WebSocket handshake timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Sets where malformed frames and failing handlers are reported.
    #[inline]
    #[must_use]
    pub fn reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.options = self.options.with_reporter(reporter);
        self
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: SocketOptions) -> Self {
        self.options = options;
        self
    }

    /// Validates and returns the collected options.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] for zero timeouts or limits.
    pub fn build(self) -> Result<SocketOptions> {
        self.options.validate()?;
        Ok(self.options)
    }

    /// Opens a WebSocket to `endpoint` with the collected options.
    ///
    /// # Errors
    ///
    /// See [`transport::connect`].
    pub async fn connect(self, endpoint: &str) -> Result<Connection> {
        transport::connect(endpoint, self.options).await
    }

    /// Attaches to an already open WebSocket stream.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the options are invalid.
    pub fn attach<S>(self, ws_stream: WebSocketStream<S>) -> Result<Connection>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Connection::new(ws_stream, self.options)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::tungstenite::protocol::Role;

    use crate::error::Error;

    #[test]
    fn test_builder_collects_options() {
        let options = SocketBuilder::new()
            .command_timeout(Duration::from_secs(3))
            .max_pending(64)
            .connect_timeout(Duration::from_secs(7))
            .build()
            .expect("valid options");

        assert_eq!(options.command_timeout, Some(Duration::from_secs(3)));
        assert_eq!(options.max_pending, Some(64));
        assert_eq!(options.connect_timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_build_rejects_zero_limit() {
        let result = SocketBuilder::new().max_pending(0).build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_attach_to_open_stream() {
        let (client_io, peer_io) = tokio::io::duplex(4096);
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        let mut peer = WebSocketStream::from_raw_socket(peer_io, Role::Server, None).await;

        let connection = Connection::builder()
            .reporter(|_: &Error| {})
            .attach(client)
            .expect("attach");

        let caller = connection.clone();
        let call = tokio::spawn(async move { caller.send_command("Runtime.enable", ()).await });

        let Some(Ok(Message::Text(text))) = peer.next().await else {
            panic!("expected a command frame");
        };
        let command: Value = serde_json::from_str(text.as_str()).expect("json");
        assert_eq!(command["method"], "Runtime.enable");

        peer.send(Message::Text(json!({ "id": command["id"], "result": {} }).to_string().into()))
            .await
            .expect("send");

        assert_eq!(call.await.expect("join").expect("success"), json!({}));
    }
}
