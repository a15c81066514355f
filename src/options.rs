//! Connection options.
//!
//! Tunes how a [`crate::Connection`] waits, how many commands it keeps in
//! flight and where it reports dropped frames.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use cdp_socket::SocketOptions;
//!
//! let options = SocketOptions::new()
//!     .with_command_timeout(Duration::from_secs(10))
//!     .with_max_pending(256);
//!
//! assert_eq!(options.max_pending, Some(256));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::{Reporter, TracingReporter};

// ============================================================================
// Constants
// ============================================================================

/// Default time allowed for the WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SocketOptions
// ============================================================================

/// Per-connection configuration.
#[derive(Clone)]
pub struct SocketOptions {
    /// Default timeout applied by [`crate::Connection::send_command`].
    ///
    /// `None` waits until the response arrives or the connection dies.
    pub command_timeout: Option<Duration>,

    /// Maximum number of commands awaiting a response. `None` is unbounded.
    pub max_pending: Option<usize>,

    /// Time allowed for opening the WebSocket.
    pub connect_timeout: Duration,

    /// Sink for malformed frames and failing event handlers.
    pub reporter: Arc<dyn Reporter>,
}

// ============================================================================
// Constructors
// ============================================================================

impl SocketOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            command_timeout: None,
            max_pending: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reporter: Arc::new(TracingReporter),
        }
    }
}

impl fmt::Debug for SocketOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketOptions")
            .field("command_timeout", &self.command_timeout)
            .field("max_pending", &self.max_pending)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SocketOptions {
    /// Sets the default command timeout.
    #[inline]
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Limits the number of in-flight commands.
    #[inline]
    #[must_use]
    pub fn with_max_pending(mut self, limit: usize) -> Self {
        self.max_pending = Some(limit);
        self
    }

    /// Sets the WebSocket handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Replaces the default [`TracingReporter`].
    #[inline]
    #[must_use]
    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SocketOptions {
    /// Checks the options for values that can never work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for zero timeouts or a zero pending limit.
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config("command timeout must be greater than zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::config("connect timeout must be greater than zero"));
        }
        if self.max_pending == Some(0) {
            return Err(Error::config("max pending must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
