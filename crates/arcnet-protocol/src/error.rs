//! Error types for the protocol layer.
//!
//! Each crate in Arcnet defines its own error enum. A `ProtocolError` always
//! means the problem is in framing (turning envelopes into bytes and back),
//! never in validation or delivery.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of an envelope failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization of an envelope failed.
    ///
    /// Common causes: malformed JSON, an unknown message kind, or a
    /// truncated frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but violates protocol rules.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
