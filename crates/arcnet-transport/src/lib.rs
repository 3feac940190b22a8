//! Transport abstraction layer for Arcnet.
//!
//! Provides the [`ServerTransport`] and [`ClientTransport`] traits that
//! live remotes send envelopes through, and the [`MessagingService`] trait
//! that cross-process broadcasts publish through.
//!
//! Inbound envelopes are routed by remote name: each live remote registers
//! one handler for its name with [`ServerTransport::on_receive`] /
//! [`ClientTransport::on_receive`]. Every endpoint delivers inbound traffic
//! from a single pump task, so handlers for one endpoint never run
//! concurrently with each other.
//!
//! # Implementations
//!
//! - [`MemoryNetwork`]: in-process server and clients over tokio channels.
//! - [`MemoryMessaging`]: in-process message bus.
//! - [`WebSocketServer`] / [`WebSocketClient`]: JSON frames over
//!   `tokio-tungstenite`.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

mod error;
mod handlers;
mod memory;
mod messaging;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::{MemoryClient, MemoryNetwork, MemoryServer};
pub use messaging::{MemoryMessaging, MessageHandler, MessagingService};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketClient, WebSocketServer};

use std::sync::Arc;

use arcnet_protocol::{Envelope, PlayerId, Recipient};

/// Handles an envelope a player sent to the server.
pub type ServerHandler = Arc<dyn Fn(PlayerId, Envelope) + Send + Sync>;

/// Handles an envelope the server sent to this client.
pub type ClientHandler = Arc<dyn Fn(Envelope) + Send + Sync>;

/// Notified when a player's connection goes away.
pub type DisconnectHandler = Arc<dyn Fn(PlayerId) + Send + Sync>;

/// The server end of a connection set.
pub trait ServerTransport: Send + Sync + 'static {
    /// Queues `envelope` for every player `to` selects.
    ///
    /// Sending to a single player who isn't connected is an error. Other
    /// recipients skip players that have gone away.
    fn send(&self, to: Recipient, envelope: Envelope) -> Result<(), TransportError>;

    /// Routes inbound envelopes for `remote` to `handler`, replacing any
    /// earlier handler for the same name.
    fn on_receive(&self, remote: &str, handler: ServerHandler);

    /// Registers a callback for player disconnects.
    ///
    /// Defaults to ignoring the handler, for transports that never see
    /// disconnects.
    fn on_disconnect(&self, handler: DisconnectHandler) {
        let _ = handler;
    }

    /// Players currently connected.
    fn players(&self) -> Vec<PlayerId>;
}

/// The client end of a connection.
pub trait ClientTransport: Send + Sync + 'static {
    /// Queues `envelope` for the server.
    fn send(&self, envelope: Envelope) -> Result<(), TransportError>;

    /// Routes inbound envelopes for `remote` to `handler`, replacing any
    /// earlier handler for the same name.
    fn on_receive(&self, remote: &str, handler: ClientHandler);
}
