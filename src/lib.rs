//! CDP Socket - connection and dispatch engine for DevTools protocol clients.
//!
//! This library owns the WebSocket to a browser-like debugging target and
//! multiplexes two kinds of traffic over it:
//!
//! - **Commands**: requests tagged with an identifier the peer echoes back
//! - **Events**: named notifications the peer pushes at any time
//!
//! Key design principles:
//!
//! - One dispatch task per connection is the sole reader and writer
//! - Callers await a private wait-slot, never a shared lock
//! - Responses are matched by identifier, in whatever order they arrive
//! - Bad frames and failing handlers are reported, never fatal
//! - Connection death fails every pending command exactly once
//!
//! # Quick Start
//!
//! ```no_run
//! use cdp_socket::{Connection, Result};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct ScriptParsed {
//!     script_id: String,
//!     url: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let connection = Connection::builder()
//!         .connect("ws://127.0.0.1:9222/devtools/page/ABC")
//!         .await?;
//!
//!     connection.add_event_handler("Debugger.scriptParsed", |e: ScriptParsed| {
//!         println!("{} {}", e.script_id, e.url);
//!     });
//!
//!     connection.send_command("Debugger.enable", ()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`builder`] | Fluent connection builder |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Command identifiers |
//! | [`options`] | Connection options |
//! | [`protocol`] | Wire envelopes and frame codec |
//! | [`transport`] | Dispatch loop, pending table, handler registry |

// ============================================================================
// Modules
// ============================================================================

/// Fluent connection builder.
pub mod builder;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Command identifiers and their allocator.
pub mod identifiers;

/// Connection options.
pub mod options;

/// Wire protocol message types.
///
/// Envelopes, the frame codec and the typed command surface.
pub mod protocol;

/// WebSocket transport layer.
///
/// Dispatch loop, pending command table and event handler registry.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Connection types
pub use builder::SocketBuilder;
pub use options::SocketOptions;
pub use transport::{Connection, Reporter, TracingReporter, connect};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::CommandId;

// Protocol types
pub use protocol::{Empty, Event, EventKind, Method, RemoteError};
