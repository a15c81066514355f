//! Event message types.
//!
//! Events are notifications the peer pushes without a matching request,
//! named in `Domain.eventName` format (e.g. `Debugger.scriptParsed`).

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

// ============================================================================
// Event
// ============================================================================

/// An event notification from the peer.
///
/// # Format
///
/// ```json
/// {
///   "method": "Domain.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name in `Domain.eventName` format.
    pub method: String,

    /// Event-specific data. An empty object when the peer sent none.
    pub params: Value,
}

impl Event {
    /// Creates an event. `null` parameters become an empty object.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        Self {
            method: method.into(),
            params,
        }
    }

    /// Returns the domain name from the method.
    ///
    /// # Example
    ///
    /// ```
    /// # use cdp_socket::protocol::Event;
    /// let event = Event::new("Debugger.paused", serde_json::Value::Null);
    /// assert_eq!(event.domain(), "Debugger");
    /// ```
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name without its domain.
    ///
    /// # Example
    ///
    /// ```
    /// # use cdp_socket::protocol::Event;
    /// let event = Event::new("Debugger.paused", serde_json::Value::Null);
    /// assert_eq!(event.event_name(), "paused");
    /// ```
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }
}

// ============================================================================
// EventKind
// ============================================================================

/// A statically typed protocol event.
///
/// Implement this for the parameter struct of an event so handlers can be
/// registered with [`crate::Connection::on`].
///
/// ```
/// use cdp_socket::protocol::EventKind;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct ScriptParsed {
///     script_id: String,
///     url: String,
/// }
///
/// impl EventKind for ScriptParsed {
///     const NAME: &'static str = "Debugger.scriptParsed";
/// }
/// ```
pub trait EventKind: DeserializeOwned {
    /// Event name in `Domain.eventName` format.
    const NAME: &'static str;
}

// ============================================================================
// Tests
// ============================================================================
