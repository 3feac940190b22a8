//! Error types for the Arcnet framework.

use std::time::Duration;

use arcnet_protocol::ProtocolError;
use arcnet_transport::TransportError;
use arcnet_types::{ArgumentError, TypeError};

use crate::definitions::{RemoteKind, Side};

/// A declaration was built with inconsistent configuration.
///
/// These surface when the model is assembled, never at call time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DefinitionError {
    /// A function timeout of zero would fail every call.
    #[error("function timeout must be greater than zero")]
    ZeroTimeout,

    /// The model already has a declaration for this name on this side.
    #[error("{side:?} declaration for {name:?} already exists")]
    DuplicateName { name: String, side: Side },

    /// The remote kind has no object on this side (broadcasts are
    /// server-only).
    #[error("{kind:?} remotes have no {side:?} side")]
    UnsupportedSide { kind: RemoteKind, side: Side },

    /// A network type constructor rejected its definition.
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// A registry lookup failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContextError {
    /// No declaration exists under this name.
    #[error("no remote named {0:?}")]
    UnknownRemote(String),

    /// The remote exists only on the server.
    #[error("{0:?} is server-only")]
    ServerOnly(String),

    /// The remote exists only on the client.
    #[error("{0:?} is client-only")]
    ClientOnly(String),

    /// The remote exists but is a different kind.
    #[error("{name:?} is a {found:?}, not a {expected:?}")]
    WrongKind {
        name: String,
        expected: RemoteKind,
        found: RemoteKind,
    },

    /// A server-side lookup on a process that isn't the server.
    #[error("server remotes are unavailable outside the server")]
    NotServer,

    /// A client-side lookup on a process that isn't a client.
    #[error("client remotes are unavailable outside a client")]
    NotClient,

    /// A broadcast was declared but the server has no messaging service.
    #[error("broadcast {0:?} needs a messaging service")]
    MissingMessaging(String),

    /// `bind` was called on a function not declared with
    /// `bind_to_object`.
    #[error("{0:?} is not bound to objects")]
    NotIdentityBound(String),

    /// A live object could not attach to its transport.
    #[error("{name:?} failed to attach: {message}")]
    Attach { name: String, message: String },
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` variants let `?` convert sub-crate errors. The rest
/// describe why one send or call failed.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// A transport-level error (connection, send).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (framing).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A declaration error.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// A registry lookup error.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Arguments passed validation but could not be converted or encoded.
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    /// The call supplied the wrong number of arguments.
    #[error("{remote}: got {arg_count} arguments, expected {expected_count}")]
    ArgumentCount {
        remote: String,
        arg_count: usize,
        expected_count: usize,
    },

    /// An argument was rejected by its type.
    #[error("{remote}: argument {index}: {message}")]
    Validation {
        remote: String,
        index: usize,
        message: String,
    },

    /// Invoke middleware vetoed the send.
    #[error("{remote}: send rejected: {reason}")]
    Rejected { remote: String, reason: String },

    /// The other side answered the call with an error.
    #[error("{remote}: remote error: {reason}")]
    Remote { remote: String, reason: String },

    /// The return value didn't match the declared return type.
    #[error("{remote}: invalid return value: {message}")]
    InvalidReturn { remote: String, message: String },

    /// No response arrived within the function's timeout.
    #[error("{remote}: no response after {after:?}")]
    Timeout { remote: String, after: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let net_err: NetError = err.into();
        assert!(matches!(net_err, NetError::Transport(_)));
        assert!(net_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_context_error() {
        let net_err: NetError = ContextError::ServerOnly("Kick".into()).into();
        assert!(matches!(net_err, NetError::Context(_)));
        assert_eq!(net_err.to_string(), "\"Kick\" is server-only");
    }

    #[test]
    fn test_from_argument_error() {
        let err = ArgumentError::new(2, TypeError::NoCodec("Player".into()));
        let net_err: NetError = err.into();
        assert_eq!(net_err.to_string(), "argument 2: Player has no buffer codec");
    }

    #[test]
    fn test_timeout_message() {
        let err = NetError::Timeout {
            remote: "GetScore".into(),
            after: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "GetScore: no response after 10s");
    }
}
