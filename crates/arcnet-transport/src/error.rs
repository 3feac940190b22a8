use arcnet_protocol::{PlayerId, ProtocolError};

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// The addressed player is not connected.
    #[error("{0} is not connected")]
    UnknownPlayer(PlayerId),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Connecting to a server failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}
