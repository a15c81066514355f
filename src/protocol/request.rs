//! Request and Response message types.
//!
//! Defines the envelope for commands sent to the peer and the responses it
//! sends back.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::identifiers::CommandId;

// ============================================================================
// Request
// ============================================================================

/// A command request from the client to the peer.
///
/// # Format
///
/// ```json
/// {
///   "id": 1,
///   "method": "Domain.methodName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    /// Unique identifier for request/response correlation.
    pub id: CommandId,

    /// Method in `Domain.methodName` format.
    pub method: String,

    /// Command parameters. Always a JSON object on the wire.
    pub params: Value,
}

impl Request {
    /// Creates a request, converting `params` to JSON.
    ///
    /// Parameters that serialize to `null` (unit structs, `()`) are sent as
    /// an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if `params` cannot be serialized.
    pub fn new(id: CommandId, method: impl Into<String>, params: impl Serialize) -> Result<Self> {
        Ok(Self::from_value(id, method, serde_json::to_value(params)?))
    }

    /// Creates a request from parameters that are already JSON.
    #[must_use]
    pub fn from_value(id: CommandId, method: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from the peer to a previously sent [`Request`].
///
/// # Format
///
/// Success:
/// ```json
/// { "id": 1, "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": 1, "error": { "code": -32601, "message": "..." } }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Matches the request `id`.
    pub id: CommandId,

    /// Result or error, never both.
    pub payload: ResponsePayload,
}

/// Body of a [`Response`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// The command succeeded.
    Result(Value),
    /// The peer rejected the command.
    Error(RemoteError),
}

impl Response {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(id: CommandId, result: Value) -> Self {
        Self {
            id,
            payload: ResponsePayload::Result(result),
        }
    }

    /// Creates an error response.
    #[inline]
    #[must_use]
    pub fn failure(id: CommandId, error: RemoteError) -> Self {
        Self {
            id,
            payload: ResponsePayload::Error(error),
        }
    }

    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.payload, ResponsePayload::Result(_))
    }

    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.payload, ResponsePayload::Error(_))
    }

    /// Extracts the result value, returning error if the peer reported one.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Protocol`] carrying the peer's error verbatim.
    pub fn into_result(self) -> Result<Value> {
        match self.payload {
            ResponsePayload::Result(value) => Ok(value),
            ResponsePayload::Error(error) => Err(error.into()),
        }
    }
}

// ============================================================================
// RemoteError
// ============================================================================

/// Error payload reported by the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    /// Error code (JSON-RPC style, e.g. `-32601` for an unknown method).
    pub code: i64,

    /// Human readable message.
    pub message: String,

    /// Optional extra detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RemoteError {
    /// Builds an error from whatever the peer put under `error`.
    ///
    /// A well-formed `{code, message, data?}` object is taken as is. For any
    /// other shape, a missing or non-integer `code` becomes `0`, a missing
    /// `message` becomes the payload's JSON text, and the raw payload is kept
    /// in `data`.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let code = value.get("code").and_then(Value::as_i64);
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned);

        match (code, message) {
            (Some(code), Some(message)) => Self {
                code,
                message,
                data: match value {
                    Value::Object(mut map) => map.remove("data"),
                    _ => None,
                },
            },
            (code, message) => Self {
                code: code.unwrap_or(0),
                message: message.unwrap_or_else(|| match &value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                }),
                data: Some(value),
            },
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

// ============================================================================
// Tests
// ============================================================================
