//! WebSocket transport layer.
//!
//! This module owns the connection to the DevTools target: the dispatch loop,
//! the table of in-flight commands and the event handler registry.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐                        ┌─────────────────┐
//! │  Connection (clones)     │                        │  DevTools       │
//! │   send_command ──┐       │       WebSocket        │  target         │
//! │                  ▼       │                        │                 │
//! │  PendingTable   event ◄─►│◄──────────────────────►│                 │
//! │  HandlerRegistry loop    │                        │                 │
//! └──────────────────────────┘                        └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connect` | Opening a WebSocket to an endpoint URL |
//! | `connection` | Dispatch loop and command issuing |
//! | `pending` | In-flight commands keyed by identifier |
//! | `registry` | Event handlers keyed by event name |
//! | `report` | Sink for non-fatal dispatch errors |

// ============================================================================
// Submodules
// ============================================================================

/// Opening a connection to an endpoint.
pub mod connect;

/// WebSocket connection and dispatch loop.
pub mod connection;

/// Pending command table.
pub mod pending;

/// Event handler registry.
pub mod registry;

/// Error reporting interface.
pub mod report;

// ============================================================================
// Re-exports
// ============================================================================

pub use connect::{connect, parse_endpoint};
pub use connection::Connection;
pub use pending::{PendingTable, WaitSlotReceiver};
pub use registry::{EventCallback, HandlerRegistry};
pub use report::{Reporter, TracingReporter};
