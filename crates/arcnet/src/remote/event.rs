use std::sync::Arc;

use arcnet_protocol::{Envelope, Message, PlayerId, Recipient, Value};
use arcnet_transport::{ClientTransport, ServerTransport};

use super::{ListenerId, Listeners, RemoteCore};
use crate::definitions::Declaration;
use crate::error::NetError;
use crate::middleware::{Callback, Rejection, Sender};
use crate::sentinel::Sentinel;

/// Called with the sending player and the decoded arguments.
pub type ServerListener = dyn Fn(PlayerId, Vec<Value>) + Send + Sync;

/// Called with the decoded arguments the server sent.
pub type ClientListener = dyn Fn(Vec<Value>) + Send + Sync;

/// Runs `callback` on an inbound event envelope.
fn receive(core: &RemoteCore, callback: &Callback, sender: Sender, envelope: Envelope) {
    let Message::Event(payload) = envelope.message else {
        tracing::debug!(remote = core.name(), %sender, "ignoring non-event message");
        return;
    };
    let Some(args) = core.inbound(payload, &sender) else {
        return;
    };
    if let Err(rejection) = callback(&sender, args) {
        tracing::debug!(remote = core.name(), %sender, reason = %rejection, "event dropped");
    }
}

fn event_envelope(core: &RemoteCore, args: Vec<Value>) -> Result<Envelope, NetError> {
    let payload = core.outbound(args)?;
    Ok(Envelope::new(core.name(), Message::Event(payload))
        .with_reliability(core.declaration().reliability()))
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// The server's handle on an event.
pub struct ServerEvent {
    core: Arc<RemoteCore>,
    transport: Arc<dyn ServerTransport>,
    listeners: Arc<Listeners<ServerListener>>,
}

impl ServerEvent {
    pub(crate) fn new(
        name: &str,
        declaration: Declaration,
        transport: Arc<dyn ServerTransport>,
        sentinel: Sentinel,
    ) -> Self {
        let core = Arc::new(RemoteCore::new(name, declaration, Some(sentinel)));
        let listeners: Arc<Listeners<ServerListener>> = Arc::new(Listeners::new());

        let dispatch = Arc::clone(&listeners);
        let remote = Arc::clone(&core);
        let inner: Callback = Arc::new(move |sender: &Sender, args: Vec<Value>| -> Result<Value, Rejection> {
            let Some(player) = sender.player() else {
                return Err(Rejection::new("server events are sent by players"));
            };
            let targets = dispatch.snapshot();
            if targets.is_empty() {
                tracing::debug!(remote = remote.name(), %player, "no listeners connected");
            }
            for listener in targets {
                listener(player, args.clone());
            }
            Ok(Value::Nil)
        });
        let callback = core.compose(inner);

        let receiver = Arc::clone(&core);
        transport.on_receive(
            name,
            Arc::new(move |player: PlayerId, envelope: Envelope| {
                receive(&receiver, &callback, Sender::Player(player), envelope);
            }),
        );

        Self {
            core,
            transport,
            listeners,
        }
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn declaration(&self) -> &Declaration {
        self.core.declaration()
    }

    /// Calls `listener` for every event a player sends.
    pub fn connect<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(PlayerId, Vec<Value>) + Send + Sync + 'static,
    {
        self.listeners.add(Arc::new(listener))
    }

    pub fn disconnect(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn send_to_player(&self, player: PlayerId, args: Vec<Value>) -> Result<(), NetError> {
        self.send(Recipient::Player(player), args)
    }

    pub fn send_to_all_players(&self, args: Vec<Value>) -> Result<(), NetError> {
        self.send(Recipient::All, args)
    }

    pub fn send_to_all_players_except(
        &self,
        except: PlayerId,
        args: Vec<Value>,
    ) -> Result<(), NetError> {
        self.send(Recipient::AllExcept(except), args)
    }

    pub fn send_to_players(&self, players: &[PlayerId], args: Vec<Value>) -> Result<(), NetError> {
        self.send(Recipient::Players(players.to_vec()), args)
    }

    fn send(&self, to: Recipient, args: Vec<Value>) -> Result<(), NetError> {
        let envelope = event_envelope(&self.core, args)?;
        self.transport.send(to, envelope)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ClientEvent
// ---------------------------------------------------------------------------

/// A client's handle on an event.
pub struct ClientEvent {
    core: Arc<RemoteCore>,
    transport: Arc<dyn ClientTransport>,
    listeners: Arc<Listeners<ClientListener>>,
}

impl ClientEvent {
    pub(crate) fn new(
        name: &str,
        declaration: Declaration,
        transport: Arc<dyn ClientTransport>,
    ) -> Self {
        let core = Arc::new(RemoteCore::new(name, declaration, None));
        let listeners: Arc<Listeners<ClientListener>> = Arc::new(Listeners::new());

        let dispatch = Arc::clone(&listeners);
        let inner: Callback = Arc::new(move |_: &Sender, args: Vec<Value>| -> Result<Value, Rejection> {
            for listener in dispatch.snapshot() {
                listener(args.clone());
            }
            Ok(Value::Nil)
        });
        let callback = core.compose(inner);

        let receiver = Arc::clone(&core);
        transport.on_receive(
            name,
            Arc::new(move |envelope: Envelope| {
                receive(&receiver, &callback, Sender::Server, envelope);
            }),
        );

        Self {
            core,
            transport,
            listeners,
        }
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn declaration(&self) -> &Declaration {
        self.core.declaration()
    }

    /// Calls `listener` for every event the server sends.
    pub fn connect<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(Vec<Value>) + Send + Sync + 'static,
    {
        self.listeners.add(Arc::new(listener))
    }

    pub fn disconnect(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn send_to_server(&self, args: Vec<Value>) -> Result<(), NetError> {
        let envelope = event_envelope(&self.core, args)?;
        self.transport.send(envelope)?;
        Ok(())
    }
}
