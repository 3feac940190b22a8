//! Request/response remotes.
//!
//! A call sends a `Request` carrying a fresh id and waits, up to the
//! declaration's timeout, for the `Response` with the same id. The
//! receiving side answers from the callback set with `set_callback`; if
//! none is set the request is left unanswered and the caller times out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use arcnet_protocol::{Envelope, Message, ObjectId, Payload, PlayerId, Recipient, Value};
use arcnet_transport::{ClientTransport, ServerTransport, TransportError};

use super::RemoteCore;
use super::pending::{CallResult, PendingCalls};
use crate::definitions::{DEFAULT_FUNCTION_TIMEOUT, Declaration};
use crate::error::{ContextError, NetError};
use crate::middleware::{Callback, Rejection, Sender};
use crate::sentinel::Sentinel;

/// Answers a call from a player.
pub type ServerFunctionHandler = dyn Fn(PlayerId, Vec<Value>) -> Value + Send + Sync;

/// Answers a call from the server.
pub type ClientFunctionHandler = dyn Fn(Vec<Value>) -> Value + Send + Sync;

// ---------------------------------------------------------------------------
// Shared machinery
// ---------------------------------------------------------------------------

/// The unbound callback plus one per bound object.
struct Handlers<H: ?Sized> {
    unbound: Option<Arc<H>>,
    bound: HashMap<ObjectId, Arc<H>>,
}

struct FunctionShared<H: ?Sized> {
    core: RemoteCore,
    pending: PendingCalls,
    handlers: Mutex<Handlers<H>>,
}

impl<H: ?Sized> FunctionShared<H> {
    fn new(core: RemoteCore) -> Self {
        Self {
            core,
            pending: PendingCalls::new(),
            handlers: Mutex::new(Handlers {
                unbound: None,
                bound: HashMap::new(),
            }),
        }
    }

    fn handlers(&self) -> std::sync::MutexGuard<'_, Handlers<H>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_handler(&self, object: Option<ObjectId>, handler: Option<Arc<H>>) {
        let mut handlers = self.handlers();
        match (object, handler) {
            (None, handler) => handlers.unbound = handler,
            (Some(object), Some(handler)) => {
                handlers.bound.insert(object, handler);
            }
            (Some(object), None) => {
                handlers.bound.remove(&object);
            }
        }
    }

    /// Picks the callback for `args`. A bound callback gets the arguments
    /// without the leading object id.
    fn resolve(&self, mut args: Vec<Value>) -> Option<(Arc<H>, Vec<Value>)> {
        let handlers = self.handlers();
        if self.core.declaration().is_identity_bound() {
            let bound = args
                .first()
                .and_then(Value::as_object)
                .and_then(|object| handlers.bound.get(&object));
            if let Some(handler) = bound {
                let handler = Arc::clone(handler);
                args.remove(0);
                return Some((handler, args));
            }
        }
        handlers.unbound.clone().map(|handler| (handler, args))
    }

    fn has_handler(&self, args: &[Value]) -> bool {
        let handlers = self.handlers();
        let bound = self.core.declaration().is_identity_bound()
            && args
                .first()
                .and_then(Value::as_object)
                .is_some_and(|object| handlers.bound.contains_key(&object));
        bound || handlers.unbound.is_some()
    }

    /// Handles one inbound envelope. Returns the response to send, if any.
    fn receive(&self, callback: &Callback, sender: Sender, envelope: Envelope) -> Option<Envelope> {
        match envelope.message {
            Message::Request { id, payload } => {
                let result = self.answer(callback, &sender, payload)?;
                Some(Envelope::new(self.core.name(), Message::Response { id, result }))
            }
            Message::Response { id, result } => {
                if !self.pending.complete(id, sender.player(), result) {
                    tracing::debug!(remote = self.core.name(), id, %sender, "discarding late response");
                }
                None
            }
            Message::Event(_) => {
                tracing::debug!(remote = self.core.name(), %sender, "ignoring event on a function");
                None
            }
        }
    }

    fn answer(&self, callback: &Callback, sender: &Sender, payload: Payload) -> Option<CallResult> {
        let Some(args) = self.core.inbound(payload, sender) else {
            return Some(Err("invalid arguments".into()));
        };
        if !self.has_handler(&args) {
            tracing::debug!(remote = self.core.name(), %sender, "no callback set, leaving call unanswered");
            return None;
        }
        let result = match callback(sender, args) {
            Ok(value) => self.core.encode_return(&value).map_err(|message| {
                tracing::warn!(remote = self.core.name(), %message, "callback returned an invalid value");
                format!("invalid return value: {message}")
            }),
            Err(rejection) => Err(rejection.reason),
        };
        Some(result)
    }

    /// Sends a request through `send` and waits for its response.
    async fn call(
        &self,
        responder: Option<PlayerId>,
        args: Vec<Value>,
        send: impl FnOnce(Envelope) -> Result<(), TransportError>,
    ) -> Result<Value, NetError> {
        let payload = self.core.outbound(args)?;
        let (id, rx) = self.pending.start(responder);
        // Dropping this future before a response arrives must not leak the entry.
        let _guard = self.pending.guard(id);
        let request = Envelope::new(self.core.name(), Message::Request { id, payload });
        send(request)?;

        let after = self
            .core
            .declaration()
            .timeout()
            .unwrap_or(DEFAULT_FUNCTION_TIMEOUT);
        match tokio::time::timeout(after, rx).await {
            Ok(Ok(Ok(payload))) => self.core.decode_return(payload),
            Ok(Ok(Err(reason))) => Err(NetError::Remote {
                remote: self.core.name().to_owned(),
                reason,
            }),
            Ok(Err(_)) => Err(TransportError::ConnectionClosed(format!(
                "{} disconnected before answering",
                responder.map_or_else(|| "server".to_owned(), |p| p.to_string())
            ))
            .into()),
            Err(_) => {
                tracing::debug!(remote = self.core.name(), id, ?after, "call timed out");
                Err(NetError::Timeout {
                    remote: self.core.name().to_owned(),
                    after,
                })
            }
        }
    }

    fn check_bindable(&self) -> Result<(), ContextError> {
        if self.core.declaration().is_identity_bound() {
            Ok(())
        } else {
            Err(ContextError::NotIdentityBound(self.core.name().to_owned()))
        }
    }
}

fn with_object(object: ObjectId, mut args: Vec<Value>) -> Vec<Value> {
    args.insert(0, Value::Object(object));
    args
}

// ---------------------------------------------------------------------------
// ServerFunction
// ---------------------------------------------------------------------------

/// The server's handle on a function.
pub struct ServerFunction {
    shared: Arc<FunctionShared<ServerFunctionHandler>>,
    transport: Arc<dyn ServerTransport>,
}

impl ServerFunction {
    pub(crate) fn new(
        name: &str,
        declaration: Declaration,
        transport: Arc<dyn ServerTransport>,
        sentinel: Sentinel,
    ) -> Self {
        let shared: Arc<FunctionShared<ServerFunctionHandler>> = Arc::new(FunctionShared::new(
            RemoteCore::new(name, declaration, Some(sentinel)),
        ));

        let dispatch = Arc::clone(&shared);
        let inner: Callback = Arc::new(move |sender: &Sender, args: Vec<Value>| -> Result<Value, Rejection> {
            let Some(player) = sender.player() else {
                return Err(Rejection::new("server functions are called by players"));
            };
            match dispatch.resolve(args) {
                Some((handler, args)) => Ok(handler(player, args)),
                None => Err(Rejection::new("no callback set")),
            }
        });
        let callback = shared.core.compose(inner);

        let receiver = Arc::clone(&shared);
        let replies: Weak<dyn ServerTransport> = Arc::downgrade(&transport);
        transport.on_receive(
            name,
            Arc::new(move |player: PlayerId, envelope: Envelope| {
                let Some(response) = receiver.receive(&callback, Sender::Player(player), envelope)
                else {
                    return;
                };
                let Some(transport) = replies.upgrade() else {
                    return;
                };
                if let Err(e) = transport.send(Recipient::Player(player), response) {
                    tracing::warn!(remote = receiver.core.name(), %player, error = %e, "failed to send response");
                }
            }),
        );

        let departed = Arc::clone(&shared);
        transport.on_disconnect(Arc::new(move |player: PlayerId| departed.pending.abandon(player)));

        Self { shared, transport }
    }

    pub fn name(&self) -> &str {
        self.shared.core.name()
    }

    pub fn declaration(&self) -> &Declaration {
        self.shared.core.declaration()
    }

    /// Answers calls from players. Replaces any earlier callback.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(PlayerId, Vec<Value>) -> Value + Send + Sync + 'static,
    {
        self.shared.set_handler(None, Some(Arc::new(callback)));
    }

    /// Removes the callback. Later calls go unanswered.
    pub fn clear_callback(&self) {
        self.shared.set_handler(None, None);
    }

    /// Calls the function on `player`'s client and waits for the answer.
    pub async fn call_player(&self, player: PlayerId, args: Vec<Value>) -> Result<Value, NetError> {
        self.shared
            .call(Some(player), args, |request| {
                self.transport.send(Recipient::Player(player), request)
            })
            .await
    }

    /// A handle scoped to one object of an identity-bound function.
    pub fn bind(self: &Arc<Self>, object: ObjectId) -> Result<BoundServerFunction, ContextError> {
        self.shared.check_bindable()?;
        Ok(BoundServerFunction {
            function: Arc::clone(self),
            object,
        })
    }
}

/// A [`ServerFunction`] scoped to one object.
///
/// Its callback only sees calls for this object, without the leading id.
/// Its calls prepend the id.
pub struct BoundServerFunction {
    function: Arc<ServerFunction>,
    object: ObjectId,
}

impl BoundServerFunction {
    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(PlayerId, Vec<Value>) -> Value + Send + Sync + 'static,
    {
        self.function
            .shared
            .set_handler(Some(self.object), Some(Arc::new(callback)));
    }

    pub fn clear_callback(&self) {
        self.function.shared.set_handler(Some(self.object), None);
    }

    pub async fn call_player(&self, player: PlayerId, args: Vec<Value>) -> Result<Value, NetError> {
        self.function
            .call_player(player, with_object(self.object, args))
            .await
    }
}

// ---------------------------------------------------------------------------
// ClientFunction
// ---------------------------------------------------------------------------

/// A client's handle on a function.
pub struct ClientFunction {
    shared: Arc<FunctionShared<ClientFunctionHandler>>,
    transport: Arc<dyn ClientTransport>,
}

impl ClientFunction {
    pub(crate) fn new(
        name: &str,
        declaration: Declaration,
        transport: Arc<dyn ClientTransport>,
    ) -> Self {
        let shared: Arc<FunctionShared<ClientFunctionHandler>> =
            Arc::new(FunctionShared::new(RemoteCore::new(name, declaration, None)));

        let dispatch = Arc::clone(&shared);
        let inner: Callback = Arc::new(move |_: &Sender, args: Vec<Value>| -> Result<Value, Rejection> {
            match dispatch.resolve(args) {
                Some((handler, args)) => Ok(handler(args)),
                None => Err(Rejection::new("no callback set")),
            }
        });
        let callback = shared.core.compose(inner);

        let receiver = Arc::clone(&shared);
        let replies: Weak<dyn ClientTransport> = Arc::downgrade(&transport);
        transport.on_receive(
            name,
            Arc::new(move |envelope: Envelope| {
                let Some(response) = receiver.receive(&callback, Sender::Server, envelope) else {
                    return;
                };
                let Some(transport) = replies.upgrade() else {
                    return;
                };
                if let Err(e) = transport.send(response) {
                    tracing::warn!(remote = receiver.core.name(), error = %e, "failed to send response");
                }
            }),
        );

        Self { shared, transport }
    }

    pub fn name(&self) -> &str {
        self.shared.core.name()
    }

    pub fn declaration(&self) -> &Declaration {
        self.shared.core.declaration()
    }

    /// Answers calls from the server. Replaces any earlier callback.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(Vec<Value>) -> Value + Send + Sync + 'static,
    {
        self.shared.set_handler(None, Some(Arc::new(callback)));
    }

    pub fn clear_callback(&self) {
        self.shared.set_handler(None, None);
    }

    /// Calls the function on the server and waits for the answer.
    pub async fn call_server(&self, args: Vec<Value>) -> Result<Value, NetError> {
        self.shared
            .call(None, args, |request| self.transport.send(request))
            .await
    }

    /// A handle scoped to one object of an identity-bound function.
    pub fn bind(self: &Arc<Self>, object: ObjectId) -> Result<BoundClientFunction, ContextError> {
        self.shared.check_bindable()?;
        Ok(BoundClientFunction {
            function: Arc::clone(self),
            object,
        })
    }
}

/// A [`ClientFunction`] scoped to one object.
pub struct BoundClientFunction {
    function: Arc<ClientFunction>,
    object: ObjectId,
}

impl BoundClientFunction {
    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(Vec<Value>) -> Value + Send + Sync + 'static,
    {
        self.function
            .shared
            .set_handler(Some(self.object), Some(Arc::new(callback)));
    }

    pub fn clear_callback(&self) {
        self.function.shared.set_handler(Some(self.object), None);
    }

    pub async fn call_server(&self, args: Vec<Value>) -> Result<Value, NetError> {
        self.function
            .call_server(with_object(self.object, args))
            .await
    }
}
