//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Envelopes travel as JSON in binary frames. Each connection gets one
//! reader task and one writer task; the writer drains an unbounded queue so
//! [`ServerTransport::send`] never waits on the network. On the server all
//! reader tasks feed a single pump task, so handlers run one at a time just
//! as they do on [`MemoryNetwork`](crate::MemoryNetwork).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arcnet_protocol::{Codec, Envelope, JsonCodec, PlayerId, Recipient};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::handlers::{DisconnectHandlers, HandlerTable};
use crate::{
    ClientHandler, ClientTransport, DisconnectHandler, ServerHandler, ServerTransport,
    TransportError,
};

enum Inbound {
    Envelope(PlayerId, Envelope),
    Disconnected(PlayerId),
}

type Outbound = mpsc::UnboundedSender<Message>;

struct ServerShared {
    handlers: HandlerTable<ServerHandler>,
    disconnect_handlers: DisconnectHandlers,
    clients: Mutex<HashMap<PlayerId, Outbound>>,
    next_player: AtomicU64,
}

impl ServerShared {
    fn clients(&self) -> MutexGuard<'_, HashMap<PlayerId, Outbound>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A WebSocket server that accepts players and routes their envelopes.
pub struct WebSocketServer {
    shared: Arc<ServerShared>,
    local_addr: SocketAddr,
}

impl WebSocketServer {
    /// Binds to `addr` and starts accepting connections in the background.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        let local_addr = listener.local_addr().map_err(TransportError::AcceptFailed)?;
        tracing::info!(%local_addr, "WebSocket transport listening");

        let shared = Arc::new(ServerShared {
            handlers: HandlerTable::new(),
            disconnect_handlers: DisconnectHandlers::new(),
            clients: Mutex::new(HashMap::new()),
            next_player: AtomicU64::new(1),
        });
        let (inbound, rx) = mpsc::unbounded_channel();
        tokio::spawn(server_pump(Arc::clone(&shared), rx));
        tokio::spawn(accept_loop(listener, Arc::clone(&shared), inbound));

        Ok(Self { shared, local_addr })
    }

    /// The address actually bound (useful after binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

async fn accept_loop(
    listener: TcpListener,
    shared: Arc<ServerShared>,
    inbound: mpsc::UnboundedSender<Inbound>,
) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };
        let shared = Arc::clone(&shared);
        let inbound = inbound.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, addr, shared, inbound).await {
                tracing::debug!(%addr, error = %e, "connection ended with error");
            }
        });
    }
}

async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    shared: Arc<ServerShared>,
    inbound: mpsc::UnboundedSender<Inbound>,
) -> Result<(), TransportError> {
    let ws = tokio_tungstenite::accept_async(stream).await.map_err(|e| {
        TransportError::AcceptFailed(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            e,
        ))
    })?;

    let player_id = PlayerId(shared.next_player.fetch_add(1, Ordering::Relaxed));
    let (sink, stream) = ws.split();
    let (tx, rx) = mpsc::unbounded_channel();
    shared.clients().insert(player_id, tx);
    tokio::spawn(write_frames(sink, rx));
    tracing::info!(%player_id, %addr, "player connected");

    read_frames(stream, |frame| match JsonCodec.decode::<Envelope>(frame) {
        Ok(envelope) => {
            let _ = inbound.send(Inbound::Envelope(player_id, envelope));
        }
        Err(e) => tracing::warn!(%player_id, error = %e, "malformed frame"),
    })
    .await;

    // Dropping the queue sender stops the writer, which closes the socket.
    shared.clients().remove(&player_id);
    let _ = inbound.send(Inbound::Disconnected(player_id));
    tracing::info!(%player_id, "player disconnected");
    Ok(())
}

async fn server_pump(shared: Arc<ServerShared>, mut rx: mpsc::UnboundedReceiver<Inbound>) {
    while let Some(inbound) = rx.recv().await {
        match inbound {
            Inbound::Envelope(player_id, envelope) => {
                if let Some(handler) = shared.handlers.get(&envelope.remote) {
                    handler(player_id, envelope);
                }
            }
            Inbound::Disconnected(player_id) => shared.disconnect_handlers.fire(player_id),
        }
    }
}

impl ServerTransport for WebSocketServer {
    fn send(&self, to: Recipient, envelope: Envelope) -> Result<(), TransportError> {
        let message = Message::Binary(JsonCodec.encode(&envelope)?.into());
        let clients = self.shared.clients();
        if let Recipient::Player(player_id) = to {
            let tx = clients
                .get(&player_id)
                .ok_or(TransportError::UnknownPlayer(player_id))?;
            return tx
                .send(message)
                .map_err(|_| TransportError::ConnectionClosed(player_id.to_string()));
        }
        for (player_id, tx) in clients.iter() {
            if to.includes(*player_id) && tx.send(message.clone()).is_err() {
                tracing::debug!(%player_id, "writer gone, skipping");
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
// WebSocketClient
// ---------------------------------------------------------------------------

/// A WebSocket connection to an Arcnet server.
///
/// Dropping the client closes the connection.
pub struct WebSocketClient {
    outbound: Outbound,
    handlers: Arc<HandlerTable<ClientHandler>>,
}

impl WebSocketClient {
    /// Connects to a server at `url` (`ws://host:port`).
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (ws, _) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            TransportError::ConnectFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                e,
            ))
        })?;
        tracing::debug!(url, "connected to server");

        let (sink, stream) = ws.split();
        let (outbound, rx) = mpsc::unbounded_channel();
        let handlers = Arc::new(HandlerTable::<ClientHandler>::new());
        tokio::spawn(write_frames(sink, rx));

        let reader_handlers = Arc::clone(&handlers);
        tokio::spawn(async move {
            read_frames(stream, |frame| match JsonCodec.decode::<Envelope>(frame) {
                Ok(envelope) => {
                    if let Some(handler) = reader_handlers.get(&envelope.remote) {
                        handler(envelope);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "malformed frame from server"),
            })
            .await;
            tracing::debug!("server connection closed");
        });

        Ok(Self { outbound, handlers })
    }
}

impl ClientTransport for WebSocketClient {
    fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        let message = Message::Binary(JsonCodec.encode(&envelope)?.into());
        self.outbound
            .send(message)
            .map_err(|_| TransportError::ConnectionClosed("server".into()))
    }

    fn on_receive(&self, remote: &str, handler: ClientHandler) {
        self.handlers.insert(remote, handler);
    }
}

// ---------------------------------------------------------------------------
// Frame plumbing
// ---------------------------------------------------------------------------

/// Forwards queued messages to the socket until the queue closes, then
/// closes the socket.
async fn write_frames<S>(mut sink: S, mut rx: mpsc::UnboundedReceiver<Message>)
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    while let Some(message) = rx.recv().await {
        if let Err(e) = sink.send(message).await {
            tracing::debug!(error = %e, "websocket write failed");
            return;
        }
    }
    let _ = sink.close().await;
}

/// Hands each data frame to `on_frame` until the peer closes or errors.
async fn read_frames<St>(mut stream: St, mut on_frame: impl FnMut(&[u8]))
where
    St: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Binary(data)) => on_frame(&data),
            Ok(Message::Text(text)) => on_frame(text.as_bytes()),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue, // skip ping/pong/frame
            Err(e) => {
                tracing::debug!(error = %e, "websocket read failed");
                break;
            }
        }
    }
}
