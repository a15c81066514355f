//! Wire protocol message types.
//!
//! This module defines the envelopes exchanged with the peer and the frame
//! codec that classifies inbound traffic.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Client → Peer | Command request |
//! | `Response` | Peer → Client | Command result or error |
//! | `Event` | Peer → Client | Unsolicited notification |
//!
//! # Naming
//!
//! Commands and events follow `Domain.name` format:
//!
//! - `Debugger.enable`
//! - `Debugger.scriptParsed`
//! - `HeapProfiler.takeHeapSnapshot`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Frame encoding and classification |
//! | `command` | Typed command surface |
//! | `event` | Event type |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Frame encoding and classification.
pub mod codec;

/// Typed command surface.
pub mod command;

/// Event message types.
pub mod event;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{Envelope, decode, decode_bytes, encode};
pub use command::{Empty, Method};
pub use event::{Event, EventKind};
pub use request::{RemoteError, Request, Response, ResponsePayload};
