//! Codec trait and implementations for framing envelopes as bytes.
//!
//! In-process transports hand [`Envelope`](crate::Envelope)s across
//! directly. Transports that move raw bytes (WebSocket, a message bus) need
//! a [`Codec`] to turn an envelope into a frame and back. The transport
//! picks the codec; nothing above it cares which one.
//!
//! Note that this is *not* the "buffer mode" of a remote. Buffer mode packs
//! an argument list with the per-type binary codecs from `arcnet-types` and
//! ships the result as [`Payload::Buffer`](crate::Payload::Buffer). The
//! codec here frames whatever payload it is given.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a codec is owned by long-lived reader
/// and writer tasks that Tokio may run on any worker thread.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented
    /// in this format (for example a non-finite number in JSON).
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// Human-readable frames make transport traffic easy to inspect. Remotes
/// that care about size switch on buffer mode, which shrinks the argument
/// list to a compact binary blob inside the JSON frame.
///
/// ## Example
///
/// ```rust
/// use arcnet_protocol::{Codec, Envelope, JsonCodec, Message, Payload, Value};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::new(
///     "PrintMessage",
///     Message::Event(Payload::Values(vec![Value::from("Hello")])),
/// );
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
