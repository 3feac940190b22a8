//! Identity and framing types for Arcnet's wire format.
//!
//! Everything in this module crosses the connection boundary: it gets
//! framed by a [`Codec`](crate::Codec) or handed to an in-process
//! transport as-is.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Value;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a connected player.
///
/// This is the identity collaborator: the first parameter of every
/// server-received callback and the addressing unit for server sends.
/// Transports assign ids when a connection is accepted.
///
/// `#[serde(transparent)]` keeps the wire form a plain number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identifies an application object that identity-bound functions are
/// attached to (a unit, a door, a vehicle).
///
/// A bound function prepends the object's id to every call, and the
/// receiving side routes the call to the callback registered for that id
/// when there is one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O-{}", self.0)
    }
}

/// Identifies one server process in a cross-process broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Creates a job id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive a server send?
// ---------------------------------------------------------------------------

/// Addresses a server-to-client send.
///
/// Clients always send to the server, so only the server side ever
/// builds one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every connected player.
    All,

    /// One specific player.
    Player(PlayerId),

    /// Every connected player except one (usually the one whose action
    /// caused the send).
    AllExcept(PlayerId),

    /// An explicit list of players.
    Players(Vec<PlayerId>),
}

impl Recipient {
    /// Returns `true` if a player with this id should receive the send.
    pub fn includes(&self, player_id: PlayerId) -> bool {
        match self {
            Self::All => true,
            Self::Player(id) => *id == player_id,
            Self::AllExcept(id) => *id != player_id,
            Self::Players(ids) => ids.contains(&player_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Reliability: delivery class
// ---------------------------------------------------------------------------

/// The delivery class requested for a message.
///
/// This is a pass-through property: the framework records what the
/// declaration asked for and the transport decides what it can honor.
/// Transports without an unreliable channel deliver everything reliably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum Reliability {
    /// Delivered in order, no loss.
    #[default]
    ReliableOrdered,

    /// Delivered, possibly out of order.
    ReliableUnordered,

    /// May be lost or reordered. Declared with `unreliable()` on an event.
    Unreliable,
}

impl Reliability {
    /// Returns `true` for the lossy class.
    pub fn is_unreliable(&self) -> bool {
        matches!(self, Self::Unreliable)
    }
}

// ---------------------------------------------------------------------------
// Payload: an argument list on the wire
// ---------------------------------------------------------------------------

/// An argument list (or a return value) in one of the two wire modes.
///
/// ```text
/// plain:  { "type": "Values", "data": [ {"type":"String","value":"hi"} ] }
/// buffer: { "type": "Buffer", "data": [3, 0, 0, 0, 104, 105, 33] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    /// Plain mode: wire values passed through the transport's own
    /// serialization.
    Values(Vec<Value>),

    /// Buffer mode: every argument packed into one contiguous binary block
    /// by its network type's codec.
    Buffer(Vec<u8>),
}

impl Payload {
    /// Returns `true` for buffer-mode payloads.
    pub fn is_buffer(&self) -> bool {
        matches!(self, Self::Buffer(_))
    }
}

// ---------------------------------------------------------------------------
// Message: what the envelope carries
// ---------------------------------------------------------------------------

/// The kind of traffic inside an envelope.
///
/// Events are fire-and-forget. Functions use a request/response pair that
/// shares an `id`; the id is unique per remote object on the calling side,
/// so responses are matched by id rather than by arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body")]
pub enum Message {
    /// A fired event.
    Event(Payload),

    /// A function call awaiting a response.
    Request { id: u64, payload: Payload },

    /// The answer to a `Request` with the same id. `Err` carries a short
    /// reason when the receiver refused the call (rate limited, filtered,
    /// failed validation).
    Response {
        id: u64,
        result: Result<Payload, String>,
    },
}

// ---------------------------------------------------------------------------
// Envelope: the top-level wire format
// ---------------------------------------------------------------------------

/// The top-level frame. Every remote call travels inside one.
///
/// ```text
/// ┌──────────────────────────────────┐
/// │ remote: "PrintMessage"           │  ← which declared object
/// │ reliability: ReliableOrdered     │  ← delivery class
/// │ ┌──────────────────────────────┐ │
/// │ │ message: Event(Values[...])  │ │  ← the call itself
/// │ └──────────────────────────────┘ │
/// └──────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Name of the remote object, as declared.
    pub remote: String,

    /// Delivery class. Defaults to `ReliableOrdered` when missing.
    #[serde(default)]
    pub reliability: Reliability,

    /// The event, request, or response.
    pub message: Message,
}

impl Envelope {
    /// Creates a reliable envelope for the given remote.
    pub fn new(remote: impl Into<String>, message: Message) -> Self {
        Self {
            remote: remote.into(),
            reliability: Reliability::default(),
            message,
        }
    }

    /// Sets the delivery class.
    pub fn with_reliability(mut self, reliability: Reliability) -> Self {
        self.reliability = reliability;
        self
    }
}

/// Frame for cross-process broadcasts published on a messaging topic.
///
/// `target == None` addresses every server; subscribers drop frames
/// addressed to a different job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEnvelope {
    /// The publishing server.
    pub source: JobId,

    /// The addressed server, or `None` for all servers.
    #[serde(default)]
    pub target: Option<JobId>,

    /// The argument list.
    pub payload: Payload,
}

impl BroadcastEnvelope {
    /// Returns `true` if the server identified by `job` should handle it.
    pub fn is_addressed_to(&self, job: &JobId) -> bool {
        self.target.as_ref().is_none_or(|target| target == job)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Wire shape tests. A change in these shapes breaks any peer that
    //! was built against the previous release.

    use super::*;

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
        assert_eq!(ObjectId(3).to_string(), "O-3");
        assert_eq!(JobId::new("a1").to_string(), "job-a1");
    }

    #[test]
    fn test_job_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&JobId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }

    // =====================================================================
    // Recipient
    // =====================================================================

    #[test]
    fn test_recipient_includes() {
        let p1 = PlayerId(1);
        let p2 = PlayerId(2);

        assert!(Recipient::All.includes(p1));
        assert!(Recipient::Player(p1).includes(p1));
        assert!(!Recipient::Player(p1).includes(p2));
        assert!(!Recipient::AllExcept(p1).includes(p1));
        assert!(Recipient::AllExcept(p1).includes(p2));
        assert!(Recipient::Players(vec![p2]).includes(p2));
        assert!(!Recipient::Players(vec![p2]).includes(p1));
    }

    // =====================================================================
    // Reliability
    // =====================================================================

    #[test]
    fn test_reliability_default_is_reliable_ordered() {
        assert_eq!(Reliability::default(), Reliability::ReliableOrdered);
        assert!(!Reliability::default().is_unreliable());
    }

    #[test]
    fn test_reliability_serializes_as_pascal_case() {
        let json = serde_json::to_string(&Reliability::Unreliable).unwrap();
        assert_eq!(json, "\"Unreliable\"");
    }

    // =====================================================================
    // Payload / Message / Envelope
    // =====================================================================

    #[test]
    fn test_payload_buffer_json_format() {
        let json = serde_json::to_value(Payload::Buffer(vec![1, 2])).unwrap();
        assert_eq!(json["type"], "Buffer");
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_message_event_json_format() {
        let msg = Message::Event(Payload::Values(vec![]));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["kind"], "Event");
        assert_eq!(json["body"]["type"], "Values");
    }

    #[test]
    fn test_message_response_error_round_trip() {
        let msg = Message::Response {
            id: 9,
            result: Err("rate limited".into()),
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: Message = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_envelope_reliability_defaults_when_missing() {
        let json = r#"{
            "remote": "Chat",
            "message": { "kind": "Event", "body": { "type": "Buffer", "data": [] } }
        }"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.reliability, Reliability::ReliableOrdered);
        assert_eq!(envelope.remote, "Chat");
    }

    #[test]
    fn test_envelope_with_reliability() {
        let envelope = Envelope::new("Move", Message::Event(Payload::Buffer(vec![])))
            .with_reliability(Reliability::Unreliable);
        assert!(envelope.reliability.is_unreliable());
    }

    #[test]
    fn test_decode_unknown_message_kind_returns_error() {
        let unknown = r#"{"kind": "Teleport", "body": {}}"#;
        let result: Result<Message, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    // =====================================================================
    // BroadcastEnvelope
    // =====================================================================

    #[test]
    fn test_broadcast_addressing() {
        let here = JobId::new("here");
        let there = JobId::new("there");

        let to_all = BroadcastEnvelope {
            source: there.clone(),
            target: None,
            payload: Payload::Values(vec![]),
        };
        assert!(to_all.is_addressed_to(&here));

        let to_there = BroadcastEnvelope {
            target: Some(there.clone()),
            ..to_all.clone()
        };
        assert!(!to_there.is_addressed_to(&here));
        assert!(to_there.is_addressed_to(&there));
    }
}
