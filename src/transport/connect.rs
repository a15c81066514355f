//! Opening a connection to a DevTools endpoint.
//!
//! Handshake details beyond the WebSocket upgrade are left to the caller:
//! the endpoint URL (for Chrome, the `webSocketDebuggerUrl` of a target) must
//! already be known.
//!
//! # Connection Flow
//!
//! 1. Validate the endpoint URL (`ws://` or `wss://`)
//! 2. Open the WebSocket, bounded by the connect timeout
//! 3. Spawn the dispatch loop over the open stream

// ============================================================================
// Imports
// ============================================================================

use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Error as WsError;
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::options::SocketOptions;

use super::Connection;

// ============================================================================
// Endpoint
// ============================================================================

/// Parses and checks a WebSocket endpoint URL.
///
/// # Errors
///
/// Returns [`Error::Config`] if the URL does not parse or its scheme is not
/// `ws` or `wss`.
pub fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)
        .map_err(|e| Error::config(format!("invalid endpoint {endpoint:?}: {e}")))?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        scheme => Err(Error::config(format!(
            "endpoint must use ws:// or wss://, got {scheme}://"
        ))),
    }
}

// ============================================================================
// Connect
// ============================================================================

/// Opens a WebSocket to `endpoint` and starts the dispatch loop.
///
/// # Errors
///
/// - [`Error::Config`] if the endpoint or options are invalid
/// - [`Error::ConnectionTimeout`] if the handshake exceeds the connect timeout
/// - [`Error::Io`] if the TCP connection cannot be opened
/// - [`Error::WebSocket`] if the WebSocket upgrade fails
pub async fn connect(endpoint: &str, options: SocketOptions) -> Result<Connection> {
    options.validate()?;
    let url = parse_endpoint(endpoint)?;
    let connect_timeout = options.connect_timeout;

    debug!(%url, "Opening WebSocket");

    let (ws_stream, _response) = timeout(connect_timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| Error::connection_timeout(connect_timeout))?
        .map_err(|e| match e {
            WsError::Io(source) => Error::Io(source),
            other => Error::WebSocket(other),
        })?;

    info!(%url, "WebSocket connection established");

    Connection::new(ws_stream, options)
}

// ============================================================================
// Tests
// ============================================================================
