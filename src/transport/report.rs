//! Reporting of non-fatal dispatch faults.
//!
//! Malformed frames and failing event handlers never stop the dispatch loop.
//! They are handed to a [`Reporter`] instead, chosen per connection through
//! [`crate::SocketOptions::with_reporter`].

// ============================================================================
// Imports
// ============================================================================

use tracing::warn;

use crate::error::Error;

// ============================================================================
// Reporter
// ============================================================================

/// Sink for errors the dispatch loop handles locally.
pub trait Reporter: Send + Sync {
    /// Called once per dropped frame or failed handler invocation.
    fn report(&self, error: &Error);
}

// ============================================================================
// TracingReporter
// ============================================================================

/// Default reporter: logs each error at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, error: &Error) {
        warn!(error = %error, "Dropped inbound message");
    }
}

impl<F> Reporter for F
where
    F: Fn(&Error) + Send + Sync,
{
    fn report(&self, error: &Error) {
        self(error);
    }
}

// ============================================================================
// Tests
// ============================================================================
