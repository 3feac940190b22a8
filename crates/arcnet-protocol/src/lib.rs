//! Wire vocabulary for Arcnet.
//!
//! This crate defines what travels between a server and its clients:
//!
//! - **Values** ([`Value`]): the dynamic, host-native values that remote
//!   events and functions carry as arguments and return values.
//! - **Identity** ([`PlayerId`], [`ObjectId`], [`JobId`]): who sent a
//!   call, which object a bound call targets, which server process
//!   published a broadcast.
//! - **Envelopes** ([`Envelope`], [`Message`], [`Payload`],
//!   [`BroadcastEnvelope`]): the framing around an argument list.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes become bytes
//!   for transports that move raw bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Transport (envelopes/bytes) → Protocol (Envelope, Value) → Types (NetworkType)
//! ```
//!
//! The protocol layer knows nothing about validation or declarations. It
//! only knows the shape of the data on the wire.

mod codec;
mod error;
mod types;
mod value;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    BroadcastEnvelope, Envelope, JobId, Message, ObjectId, Payload, PlayerId,
    Recipient, Reliability,
};
pub use value::Value;
