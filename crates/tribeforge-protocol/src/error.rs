//! Error types for the protocol layer.
//!
//! Each crate in Tribeforge defines its own error enum. A `ProtocolError`
//! means the problem is in serialization or in a value that arrived from
//! the outside world, never in persistence or lobby bookkeeping.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or an
    /// unknown message `type` tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but breaks a protocol rule, e.g. a
    /// `Hello` arriving after the connection is already identified.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A selection from one of the fixed enumerations (map type, map
    /// size, tribe) did not name a known value, or was empty.
    #[error("invalid {kind}: {value:?}")]
    InvalidInput {
        /// Which enumeration was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },
}
