//! Error types for the CDP socket.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use cdp_socket::{Connection, Result};
//!
//! async fn example(connection: &Connection) -> Result<()> {
//!     connection.send_command("Debugger.enable", ()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Framing | [`Error::MalformedFrame`], [`Error::DuplicateIdentifier`], [`Error::TooManyPending`] |
//! | Peer | [`Error::Protocol`] |
//! | Callbacks | [`Error::CallbackDecode`], [`Error::CallbackPanicked`] |
//! | Execution | [`Error::RequestTimeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::CommandId;
use crate::protocol::RemoteError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when socket options or the endpoint URL are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the connection cannot be established, or when a frame
    /// could not be written to it.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Timed out opening the connection.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The connection is dead.
    ///
    /// Delivered to every command still pending when the dispatch loop
    /// terminates, and returned for any command issued afterwards.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Framing Errors
    // ========================================================================
    /// Inbound frame is neither a response nor an event envelope.
    #[error("Malformed frame: {message}")]
    MalformedFrame {
        /// What was wrong with the frame.
        message: String,
    },

    /// A command identifier was registered twice.
    ///
    /// Identifiers come from a monotonic allocator, so this indicates a bug
    /// rather than a recoverable runtime condition.
    #[error("Duplicate command identifier: {id}")]
    DuplicateIdentifier {
        /// The colliding identifier.
        id: CommandId,
    },

    /// The configured limit on in-flight commands was reached.
    #[error("Too many pending commands (limit {limit})")]
    TooManyPending {
        /// Configured limit.
        limit: usize,
    },

    // ========================================================================
    // Peer Errors
    // ========================================================================
    /// The peer answered a command with an error payload.
    #[error("Protocol error {code}: {message}")]
    Protocol {
        /// Error code reported by the peer.
        code: i64,
        /// Error message reported by the peer.
        message: String,
        /// Optional extra detail reported by the peer.
        data: Option<Value>,
    },

    // ========================================================================
    // Callback Errors
    // ========================================================================
    /// Event parameters did not match a handler's expected shape.
    #[error("Failed to decode {event} parameters: {source}")]
    CallbackDecode {
        /// Event name.
        event: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// An event handler panicked.
    #[error("Handler for {event} panicked: {message}")]
    CallbackPanicked {
        /// Event name.
        event: String,
        /// Panic payload, if it was a string.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// No response arrived within the caller's timeout.
    #[error("Command {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The identifier of the abandoned command.
        request_id: CommandId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout: Duration) -> Self {
        Self::ConnectionTimeout {
            timeout_ms: millis(timeout),
        }
    }

    /// Creates a malformed frame error.
    #[inline]
    pub fn malformed_frame(message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            message: message.into(),
        }
    }

    /// Creates a duplicate identifier error.
    #[inline]
    pub fn duplicate_identifier(id: CommandId) -> Self {
        Self::DuplicateIdentifier { id }
    }

    /// Creates a too-many-pending error.
    #[inline]
    pub fn too_many_pending(limit: usize) -> Self {
        Self::TooManyPending { limit }
    }

    /// Creates a callback decode error.
    #[inline]
    pub fn callback_decode(event: impl Into<String>, source: serde_json::Error) -> Self {
        Self::CallbackDecode {
            event: event.into(),
            source,
        }
    }

    /// Creates a callback panic error.
    #[inline]
    pub fn callback_panicked(event: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CallbackPanicked {
            event: event.into(),
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: CommandId, timeout: Duration) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms: millis(timeout),
        }
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Self {
        Self::Protocol {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::Io(_)
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the peer reported this error.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry. Nothing in this crate
    /// retries on its own.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. }
                | Self::RequestTimeout { .. }
                | Self::TooManyPending { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
