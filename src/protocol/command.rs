//! Typed command definitions.
//!
//! Per-domain wrappers describe each protocol command once, as a parameter
//! type implementing [`Method`]. [`crate::Connection::execute`] then sends it
//! and decodes the result straight into [`Method::Returns`].
//!
//! ```
//! use cdp_socket::protocol::{Empty, Method};
//! use serde::{Deserialize, Serialize};
//!
//! /// `Debugger.enable`
//! #[derive(Debug, Serialize)]
//! struct Enable;
//!
//! impl Method for Enable {
//!     const NAME: &'static str = "Debugger.enable";
//!     type Returns = Empty;
//! }
//!
//! /// `Debugger.getScriptSource`
//! #[derive(Debug, Serialize)]
//! #[serde(rename_all = "camelCase")]
//! struct GetScriptSource {
//!     script_id: String,
//! }
//!
//! #[derive(Debug, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct GetScriptSourceReturns {
//!     script_source: String,
//! }
//!
//! impl Method for GetScriptSource {
//!     const NAME: &'static str = "Debugger.getScriptSource";
//!     type Returns = GetScriptSourceReturns;
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ============================================================================
// Method
// ============================================================================

/// A protocol command with statically known parameter and result shapes.
///
/// `Self` is the parameter payload. Unit structs serialize as `{}`.
pub trait Method: Serialize {
    /// Method name in `Domain.methodName` format.
    const NAME: &'static str;

    /// Shape of the `result` object.
    type Returns: DeserializeOwned;
}

// ============================================================================
// Empty
// ============================================================================

/// Result of a command that reports nothing on success.
///
/// Decodes from any JSON object, so `{}` and objects carrying fields the
/// caller does not care about are both accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

// ============================================================================
// Tests
// ============================================================================
