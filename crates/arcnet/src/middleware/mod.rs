//! Interception chains around a remote's receive and send paths.
//!
//! **Callback middleware** wraps the function a live remote runs when a
//! call arrives (after the arguments were decoded and validated). It can
//! inspect the sender and arguments, answer from a cache, or reject the
//! call.
//!
//! **Invoke middleware** wraps the send path. It sees the logical
//! arguments before they are validated and encoded and can veto the send
//! without touching the wire.
//!
//! Links are composed once, when the registry builds the live remote. The
//! first registered link is outermost and runs first:
//!
//! ```text
//! [a, b, c]  →  a(b(c(callback)))
//! ```

mod cache;
mod filter;
mod rate_limit;

pub use cache::{Cache, CacheScope};
pub use filter::{Filter, InvokeFilter};
pub use rate_limit::RateLimit;

use std::fmt;
use std::sync::Arc;

use arcnet_protocol::{PlayerId, Value};

use crate::definitions::{RemoteKind, Side};
use crate::sentinel::{Sentinel, SentinelEvent};

/// Who made an inbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    /// The server (client-side receives and cross-server broadcasts).
    Server,
    /// A connected player (server-side receives).
    Player(PlayerId),
}

impl Sender {
    pub fn player(self) -> Option<PlayerId> {
        match self {
            Self::Server => None,
            Self::Player(id) => Some(id),
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => f.write_str("server"),
            Self::Player(id) => id.fmt(f),
        }
    }
}

/// A middleware link declined a call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct Rejection {
    pub reason: String,
}

impl Rejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The receive-side function a callback middleware wraps.
///
/// For functions the `Ok` value is the response; for events it is ignored.
pub type Callback = Arc<dyn Fn(&Sender, Vec<Value>) -> Result<Value, Rejection> + Send + Sync>;

/// The send-side function an invoke middleware wraps. Returns the
/// arguments to send.
pub type InvokeFn = Arc<dyn Fn(Vec<Value>) -> Result<Vec<Value>, Rejection> + Send + Sync>;

// ---------------------------------------------------------------------------
// RemoteInfo
// ---------------------------------------------------------------------------

/// What a middleware link knows about the remote it wraps.
#[derive(Debug, Clone)]
pub struct RemoteInfo {
    name: Arc<str>,
    kind: RemoteKind,
    side: Side,
    sentinel: Option<Sentinel>,
}

impl RemoteInfo {
    pub(crate) fn new(
        name: &str,
        kind: RemoteKind,
        side: Side,
        sentinel: Option<Sentinel>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            side,
            sentinel,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RemoteKind {
        self.kind
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Reports a rejected call to the sentinel (servers) or the log
    /// (clients).
    pub fn report(&self, event: SentinelEvent) {
        match &self.sentinel {
            Some(sentinel) => sentinel.report(event),
            None => event.log(),
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A receive-path interception link.
pub trait Middleware: Send + Sync + 'static {
    /// Returns a callback that runs this link's policy around `next`.
    fn wrap(&self, next: Callback, remote: &RemoteInfo) -> Callback;

    /// Drops any per-player state for a player who left.
    fn on_disconnect(&self, player: PlayerId) {
        let _ = player;
    }
}

/// A send-path interception link.
pub trait InvokeMiddleware: Send + Sync + 'static {
    /// Returns a send function that runs this link's policy around `next`.
    fn wrap(&self, next: InvokeFn, remote: &RemoteInfo) -> InvokeFn;
}

struct FnMiddleware<F>(F);

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(Callback, &RemoteInfo) -> Callback + Send + Sync + 'static,
{
    fn wrap(&self, next: Callback, remote: &RemoteInfo) -> Callback {
        (self.0)(next, remote)
    }
}

struct FnInvokeMiddleware<F>(F);

impl<F> InvokeMiddleware for FnInvokeMiddleware<F>
where
    F: Fn(InvokeFn, &RemoteInfo) -> InvokeFn + Send + Sync + 'static,
{
    fn wrap(&self, next: InvokeFn, remote: &RemoteInfo) -> InvokeFn {
        (self.0)(next, remote)
    }
}

/// Adapts a closure into a [`Middleware`].
///
/// ```rust
/// use std::sync::Arc;
/// use arcnet::Value;
/// use arcnet::middleware::{Callback, Sender, middleware_fn};
///
/// let log_calls = middleware_fn(|next: Callback, remote| {
///     let name = remote.name().to_owned();
///     Arc::new(move |sender: &Sender, args: Vec<Value>| {
///         tracing::info!(remote = %name, %sender, "call");
///         next(sender, args)
///     })
/// });
/// # let _ = log_calls;
/// ```
pub fn middleware_fn<F>(f: F) -> impl Middleware
where
    F: Fn(Callback, &RemoteInfo) -> Callback + Send + Sync + 'static,
{
    FnMiddleware(f)
}

/// Adapts a closure into an [`InvokeMiddleware`].
pub fn invoke_middleware_fn<F>(f: F) -> impl InvokeMiddleware
where
    F: Fn(InvokeFn, &RemoteInfo) -> InvokeFn + Send + Sync + 'static,
{
    FnInvokeMiddleware(f)
}

/// Folds `chain` around `inner`, first link outermost.
pub(crate) fn compose_callback(
    chain: &[Arc<dyn Middleware>],
    inner: Callback,
    remote: &RemoteInfo,
) -> Callback {
    chain
        .iter()
        .rev()
        .fold(inner, |next, link| link.wrap(next, remote))
}

/// Folds `chain` around the identity send function, first link outermost.
pub(crate) fn compose_invoke(chain: &[Arc<dyn InvokeMiddleware>], remote: &RemoteInfo) -> InvokeFn {
    let inner: InvokeFn = Arc::new(|args: Vec<Value>| -> Result<Vec<Value>, Rejection> { Ok(args) });
    chain
        .iter()
        .rev()
        .fold(inner, |next, link| link.wrap(next, remote))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn info() -> RemoteInfo {
        RemoteInfo::new("Test", RemoteKind::Event, Side::Server, None)
    }

    fn tagging(tag: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> Arc<dyn Middleware> {
        Arc::new(middleware_fn(move |next: Callback, _: &RemoteInfo| {
            let log = Arc::clone(&log);
            Arc::new(move |sender: &Sender, args: Vec<Value>| {
                log.lock().unwrap().push(tag);
                next(sender, args)
            })
        }))
    }

    #[test]
    fn test_first_registered_runs_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = vec![
            tagging("a", Arc::clone(&log)),
            tagging("b", Arc::clone(&log)),
            tagging("c", Arc::clone(&log)),
        ];
        let inner_log = Arc::clone(&log);
        let inner: Callback = Arc::new(move |_: &Sender, _: Vec<Value>| -> Result<Value, Rejection> {
            inner_log.lock().unwrap().push("callback");
            Ok(Value::Nil)
        });

        let composed = compose_callback(&chain, inner, &info());
        composed(&Sender::Player(PlayerId(1)), vec![]).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "callback"]);
    }

    #[test]
    fn test_empty_invoke_chain_is_identity() {
        let invoke = compose_invoke(&[], &info());
        assert_eq!(invoke(vec![Value::from(1)]).unwrap(), vec![Value::from(1)]);
    }

    #[test]
    fn test_invoke_middleware_can_veto() {
        let veto: Arc<dyn InvokeMiddleware> =
            Arc::new(invoke_middleware_fn(|next: InvokeFn, _: &RemoteInfo| {
                Arc::new(move |args: Vec<Value>| {
                    if args.is_empty() {
                        Err(Rejection::new("empty"))
                    } else {
                        next(args)
                    }
                })
            }));
        let invoke = compose_invoke(&[veto], &info());
        assert_eq!(invoke(vec![]), Err(Rejection::new("empty")));
        assert!(invoke(vec![Value::Nil]).is_ok());
    }

    #[test]
    fn test_sender_display() {
        assert_eq!(Sender::Server.to_string(), "server");
        assert_eq!(Sender::Player(PlayerId(2)).to_string(), "P-2");
        assert_eq!(Sender::Player(PlayerId(2)).player(), Some(PlayerId(2)));
    }
}
