//! Frame encoding and classification.
//!
//! Outbound requests are encoded with `serde_json`. Inbound frames are parsed
//! into a generic JSON value first and then classified by shape:
//!
//! | Shape | Envelope |
//! |-------|----------|
//! | has `id`, exactly one of `result` / `error` | [`Envelope::Response`] |
//! | has `id`, both or neither of `result` / `error` | [`Envelope::Invalid`] |
//! | no `id`, string `method` | [`Envelope::Event`] |
//! | anything else | [`Error::MalformedFrame`] |
//!
//! Once the `id` parses, the frame always yields an envelope addressed to it,
//! so the caller waiting on that id is never left hanging. The `error` payload
//! is accepted in any shape (see [`RemoteError::from_value`]).

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::CommandId;

use super::{Event, RemoteError, Request, Response};

// ============================================================================
// Envelope
// ============================================================================

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Reply to a command.
    Response(Response),
    /// Unsolicited notification.
    Event(Event),
    /// Carries a valid `id` but cannot be read as a response.
    Invalid {
        /// Identifier of the command the frame answers.
        id: CommandId,
        /// What was wrong with the frame.
        message: String,
    },
}

// ============================================================================
// Encode
// ============================================================================

/// Encodes a request as a text frame.
///
/// # Errors
///
/// Returns [`Error::Json`] if the parameters cannot be serialized.
pub fn encode(request: &Request) -> Result<String> {
    Ok(serde_json::to_string(request)?)
}

// ============================================================================
// Decode
// ============================================================================

/// Classifies a text frame.
///
/// # Errors
///
/// Returns [`Error::MalformedFrame`] if the frame is not JSON or matches
/// neither envelope shape.
pub fn decode(text: &str) -> Result<Envelope> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| Error::malformed_frame(format!("invalid JSON: {e}")))?;
    classify(value)
}

/// Classifies a binary frame holding UTF-8 JSON.
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_bytes(bytes: &[u8]) -> Result<Envelope> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::malformed_frame(format!("invalid JSON: {e}")))?;
    classify(value)
}

fn classify(value: Value) -> Result<Envelope> {
    let Value::Object(mut map) = value else {
        return Err(Error::malformed_frame("frame is not a JSON object"));
    };

    match map.remove("id") {
        Some(id) => classify_response(id, map),
        None => classify_event(map).map(Envelope::Event),
    }
}

fn classify_response(id: Value, mut map: Map<String, Value>) -> Result<Envelope> {
    let id = id
        .as_u64()
        .map(CommandId::new)
        .ok_or_else(|| Error::malformed_frame(format!("id {id} is not a non-negative integer")))?;

    let envelope = match (map.remove("result"), map.remove("error")) {
        (Some(result), None) => Envelope::Response(Response::success(id, result)),
        (None, Some(error)) => {
            Envelope::Response(Response::failure(id, RemoteError::from_value(error)))
        }
        (Some(_), Some(_)) => Envelope::Invalid {
            id,
            message: format!("response {id} carries both result and error"),
        },
        (None, None) => Envelope::Invalid {
            id,
            message: format!("response {id} carries neither result nor error"),
        },
    };
    Ok(envelope)
}

fn classify_event(mut map: Map<String, Value>) -> Result<Event> {
    let Some(Value::String(method)) = map.remove("method") else {
        return Err(Error::malformed_frame("frame has neither id nor method"));
    };

    let params = map.remove("params").unwrap_or(Value::Null);
    Ok(Event::new(method, params))
}

// ============================================================================
// Tests
// ============================================================================
