//! In-process transport over tokio channels.
//!
//! One [`MemoryServer`] and any number of [`MemoryClient`]s share a
//! [`MemoryNetwork`]. Envelopes move as values; nothing is framed. Each
//! endpoint owns an unbounded queue drained by one pump task, which is what
//! gives handlers their run-to-completion ordering.
//!
//! Must be created inside a Tokio runtime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arcnet_protocol::{Envelope, PlayerId, Recipient};
use tokio::sync::mpsc;

use crate::handlers::{DisconnectHandlers, HandlerTable};
use crate::{
    ClientHandler, ClientTransport, DisconnectHandler, ServerHandler, ServerTransport,
    TransportError,
};

/// What the server pump receives.
enum Inbound {
    Envelope(PlayerId, Envelope),
    Disconnected(PlayerId),
}

struct ServerShared {
    handlers: HandlerTable<ServerHandler>,
    disconnect_handlers: DisconnectHandlers,
    clients: Mutex<HashMap<PlayerId, mpsc::UnboundedSender<Envelope>>>,
}

impl ServerShared {
    fn clients(&self) -> MutexGuard<'_, HashMap<PlayerId, mpsc::UnboundedSender<Envelope>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A whole in-process network: one server, many clients.
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use arcnet_transport::{MemoryNetwork, ServerTransport};
///
/// let network = MemoryNetwork::new();
/// let client = network.connect();
/// assert_eq!(network.server().players(), vec![client.player_id()]);
/// # }
/// ```
pub struct MemoryNetwork {
    server: Arc<MemoryServer>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        let (inbound, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(ServerShared {
            handlers: HandlerTable::new(),
            disconnect_handlers: DisconnectHandlers::new(),
            clients: Mutex::new(HashMap::new()),
        });
        tokio::spawn(server_pump(Arc::clone(&shared), rx));
        Self {
            server: Arc::new(MemoryServer {
                shared,
                inbound,
                next_player: AtomicU64::new(1),
            }),
        }
    }

    /// The server endpoint.
    pub fn server(&self) -> Arc<MemoryServer> {
        Arc::clone(&self.server)
    }

    /// Connects a new client and assigns it a fresh [`PlayerId`].
    pub fn connect(&self) -> Arc<MemoryClient> {
        let player_id = PlayerId(self.server.next_player.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.server.shared.clients().insert(player_id, tx);

        let handlers = Arc::new(HandlerTable::new());
        tokio::spawn(client_pump(player_id, Arc::clone(&handlers), rx));
        tracing::debug!(%player_id, "memory client connected");

        Arc::new(MemoryClient {
            player_id,
            outbound: self.server.inbound.clone(),
            handlers,
        })
    }

    /// Drops a player's connection. Disconnect handlers run on the server
    /// pump after every envelope the player sent before this call.
    pub fn disconnect(&self, player_id: PlayerId) {
        if self.server.shared.clients().remove(&player_id).is_some() {
            tracing::debug!(%player_id, "memory client disconnected");
            // The pump outlives the network only if the server was dropped.
            let _ = self.server.inbound.send(Inbound::Disconnected(player_id));
        }
    }
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

async fn server_pump(shared: Arc<ServerShared>, mut rx: mpsc::UnboundedReceiver<Inbound>) {
    while let Some(inbound) = rx.recv().await {
        match inbound {
            Inbound::Envelope(player_id, envelope) => {
                if !shared.clients().contains_key(&player_id) {
                    tracing::debug!(%player_id, "dropping envelope from disconnected player");
                    continue;
                }
                if let Some(handler) = shared.handlers.get(&envelope.remote) {
                    handler(player_id, envelope);
                }
            }
            Inbound::Disconnected(player_id) => shared.disconnect_handlers.fire(player_id),
        }
    }
    tracing::debug!("memory server pump stopped");
}

async fn client_pump(
    player_id: PlayerId,
    handlers: Arc<HandlerTable<ClientHandler>>,
    mut rx: mpsc::UnboundedReceiver<Envelope>,
) {
    while let Some(envelope) = rx.recv().await {
        if let Some(handler) = handlers.get(&envelope.remote) {
            handler(envelope);
        }
    }
    tracing::debug!(%player_id, "memory client pump stopped");
}

// ---------------------------------------------------------------------------
// MemoryServer
// ---------------------------------------------------------------------------

/// The server endpoint of a [`MemoryNetwork`].
pub struct MemoryServer {
    shared: Arc<ServerShared>,
    inbound: mpsc::UnboundedSender<Inbound>,
    next_player: AtomicU64,
}

impl ServerTransport for MemoryServer {
    fn send(&self, to: Recipient, envelope: Envelope) -> Result<(), TransportError> {
        let clients = self.shared.clients();
        if let Recipient::Player(player_id) = to {
            let tx = clients
                .get(&player_id)
                .ok_or(TransportError::UnknownPlayer(player_id))?;
            return tx
                .send(envelope)
                .map_err(|_| TransportError::ConnectionClosed(player_id.to_string()));
        }
        for (player_id, tx) in clients.iter() {
            if to.includes(*player_id) && tx.send(envelope.clone()).is_err() {
                tracing::debug!(%player_id, "client queue closed, skipping");
            }
        }
        Ok(())
    }

    fn on_receive(&self, remote: &str, handler: ServerHandler) {
        self.shared.handlers.insert(remote, handler);
    }

    fn on_disconnect(&self, handler: DisconnectHandler) {
        self.shared.disconnect_handlers.push(handler);
    }

    fn players(&self) -> Vec<PlayerId> {
        let mut players: Vec<_> = self.shared.clients().keys().copied().collect();
        players.sort();
        players
    }
}

// ---------------------------------------------------------------------------
// MemoryClient
// ---------------------------------------------------------------------------

/// A client endpoint of a [`MemoryNetwork`].
pub struct MemoryClient {
    player_id: PlayerId,
    outbound: mpsc::UnboundedSender<Inbound>,
    handlers: Arc<HandlerTable<ClientHandler>>,
}

impl MemoryClient {
    /// The id the server knows this client by.
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }
}

impl ClientTransport for MemoryClient {
    fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.outbound
            .send(Inbound::Envelope(self.player_id, envelope))
            .map_err(|_| TransportError::Shutdown)
    }

    fn on_receive(&self, remote: &str, handler: ClientHandler) {
        self.handlers.insert(remote, handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcnet_protocol::{Message, Payload, Value};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn event(remote: &str, text: &str) -> Envelope {
        Envelope::new(
            remote,
            Message::Event(Payload::Values(vec![Value::from(text)])),
        )
    }

    fn forward_client(client: &MemoryClient, remote: &str) -> UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        client.on_receive(
            remote,
            Arc::new(move |envelope| {
                let _ = tx.send(envelope);
            }),
        );
        rx
    }

    #[tokio::test]
    async fn test_connect_assigns_sequential_ids() {
        let network = MemoryNetwork::new();
        let a = network.connect();
        let b = network.connect();
        assert_eq!(a.player_id(), PlayerId(1));
        assert_eq!(b.player_id(), PlayerId(2));
        assert_eq!(network.server().players(), vec![PlayerId(1), PlayerId(2)]);
    }

    #[tokio::test]
    async fn test_client_to_server() {
        let network = MemoryNetwork::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        network.server().on_receive(
            "Chat",
            Arc::new(move |player, envelope| {
                let _ = tx.send((player, envelope));
            }),
        );

        let client = network.connect();
        client.send(event("Chat", "hi")).unwrap();

        let (player, envelope) = rx.recv().await.unwrap();
        assert_eq!(player, client.player_id());
        assert_eq!(envelope, event("Chat", "hi"));
    }

    #[tokio::test]
    async fn test_recipient_selection() {
        let network = MemoryNetwork::new();
        let a = network.connect();
        let b = network.connect();
        let mut rx_a = forward_client(&a, "News");
        let mut rx_b = forward_client(&b, "News");
        let server = network.server();

        server
            .send(Recipient::AllExcept(a.player_id()), event("News", "one"))
            .unwrap();
        server
            .send(Recipient::Player(a.player_id()), event("News", "two"))
            .unwrap();

        assert_eq!(rx_b.recv().await.unwrap(), event("News", "one"));
        assert_eq!(rx_a.recv().await.unwrap(), event("News", "two"));
    }

    #[tokio::test]
    async fn test_send_to_unknown_player_fails() {
        let network = MemoryNetwork::new();
        let err = network
            .server()
            .send(Recipient::Player(PlayerId(99)), event("News", "x"))
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownPlayer(PlayerId(99))));
    }

    #[tokio::test]
    async fn test_disconnect_fires_handlers_and_drops_player() {
        let network = MemoryNetwork::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        network.server().on_disconnect(Arc::new(move |player| {
            let _ = tx.send(player);
        }));

        let client = network.connect();
        network.disconnect(client.player_id());

        assert_eq!(rx.recv().await, Some(client.player_id()));
        assert!(network.server().players().is_empty());
    }
}
