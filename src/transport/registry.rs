//! Event handler registry.
//!
//! Maps event names to the callbacks subscribed to them. Any number of
//! callbacks may share a name; they run in registration order. There is no
//! removal: registration is one-directional.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::Event;

use super::report::Reporter;

// ============================================================================
// Types
// ============================================================================

/// Type-erased event callback.
///
/// Returning an error (typically [`Error::CallbackDecode`]) reports it
/// without affecting other callbacks.
pub type EventCallback = Arc<dyn Fn(&Event) -> Result<()> + Send + Sync>;

// ============================================================================
// HandlerRegistry
// ============================================================================

/// Event callbacks keyed by event name.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<FxHashMap<String, Vec<EventCallback>>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `callback` to the handlers for `event`.
    pub fn register(&self, event: impl Into<String>, callback: EventCallback) {
        self.handlers
            .write()
            .entry(event.into())
            .or_default()
            .push(callback);
    }

    /// Invokes every handler registered for `event.method`.
    ///
    /// Handlers run on the calling thread, in registration order, with no
    /// registry lock held, so a handler may register further handlers.
    /// Failures and panics are passed to `reporter` and do not stop the
    /// remaining handlers. Returns the number of handlers invoked.
    pub fn dispatch(&self, event: &Event, reporter: &dyn Reporter) -> usize {
        let callbacks = match self.handlers.read().get(&event.method) {
            Some(callbacks) => callbacks.clone(),
            None => {
                trace!(method = %event.method, "No handler for event");
                return 0;
            }
        };

        for callback in &callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => reporter.report(&e),
                Err(panic) => {
                    reporter.report(&Error::callback_panicked(
                        &event.method,
                        panic_message(panic.as_ref()),
                    ));
                }
            }
        }

        callbacks.len()
    }

    /// Number of handlers registered for `event`.
    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.read().get(event).map_or(0, Vec::len)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
